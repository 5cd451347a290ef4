//! Document classification by magic bytes.

/// Signature every PDF file starts with.
pub const PDF_SIGNATURE: &[u8; 5] = b"%PDF-";

/// Kind of an uploaded document, deciding which extraction path runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Native PDF; its text layer is tried before OCR.
    Pdf,
    /// Anything else (photos, scans, unknown). Goes straight to OCR.
    Other,
}

/// Classify a byte buffer. Buffers shorter than the signature are `Other`.
pub fn classify(data: &[u8]) -> DocumentKind {
    if data.starts_with(PDF_SIGNATURE) {
        DocumentKind::Pdf
    } else {
        DocumentKind::Other
    }
}
