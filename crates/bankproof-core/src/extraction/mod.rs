//! Text acquisition and code extraction.
//!
//! [`ExtractionOrchestrator`] turns raw document bytes into text (PDF text
//! layer first, OCR as the universal fallback); [`normalize_text`] and
//! [`extract_codes`] turn that text into [`ExtractedCodes`].

mod codes;
mod normalize;

pub use codes::{digits_only, extract_codes, ExtractedCodes, PatternSet};
pub use normalize::normalize_text;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::document::{classify, DocumentKind};
use crate::ocr::OcrTextSource;
use crate::pdf::PdfTextSource;

/// Sequences PDF text extraction and OCR fallback.
#[derive(Clone)]
pub struct ExtractionOrchestrator {
    pdf: Arc<dyn PdfTextSource>,
    ocr: Arc<dyn OcrTextSource>,
}

impl ExtractionOrchestrator {
    /// Create an orchestrator over the given text sources.
    pub fn new(pdf: Arc<dyn PdfTextSource>, ocr: Arc<dyn OcrTextSource>) -> Self {
        Self { pdf, ocr }
    }

    /// Orchestrator using lopdf for the text layer and `pure-onnx-ocr` for scans.
    #[cfg(feature = "native")]
    pub fn native(config: &crate::models::config::BankProofConfig) -> Self {
        use crate::ocr::PureOcrEngine;
        use crate::pdf::PdfTextExtractor;

        Self::new(
            Arc::new(PdfTextExtractor::new(config.pdf.clone())),
            Arc::new(PureOcrEngine::new(config.ocr.clone(), config.pdf.clone())),
        )
    }

    /// Acquire the document's text. Never fails: total failure yields `""`.
    pub async fn extract_text(&self, data: &[u8], language: &str) -> String {
        let kind = classify(data);
        debug!("Document classified as {:?} ({} bytes)", kind, data.len());

        if kind == DocumentKind::Pdf {
            match self.pdf.extract_text(data).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!("Using PDF text layer ({} chars)", text.len());
                    return text;
                }
                Ok(_) => info!("PDF has no text layer, falling back to OCR"),
                Err(e) => warn!("PDF text extraction failed, falling back to OCR: {}", e),
            }
        }

        match self.ocr.recognize(data, language).await {
            Ok(text) => {
                info!("OCR produced {} chars (language {})", text.len(), language);
                text
            }
            Err(e) => {
                warn!("OCR failed: {}", e);
                String::new()
            }
        }
    }
}

impl std::fmt::Debug for ExtractionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionOrchestrator").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{OcrError, PdfError};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// PDF stub returning a fixed result and counting calls.
    pub(crate) struct StubPdf {
        pub text: Option<String>,
        pub calls: Mutex<usize>,
    }

    impl StubPdf {
        pub(crate) fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self { text: Some(text.to_string()), calls: Mutex::new(0) })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self { text: None, calls: Mutex::new(0) })
        }
    }

    #[async_trait]
    impl PdfTextSource for StubPdf {
        async fn extract_text(&self, _data: &[u8]) -> crate::pdf::Result<String> {
            *self.calls.lock().unwrap() += 1;
            self.text
                .clone()
                .ok_or_else(|| PdfError::Parse("stub failure".to_string()))
        }
    }

    /// OCR stub returning a fixed result and recording the language it saw.
    pub(crate) struct StubOcr {
        pub text: Option<String>,
        pub languages: Mutex<Vec<String>>,
    }

    impl StubOcr {
        pub(crate) fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self { text: Some(text.to_string()), languages: Mutex::new(Vec::new()) })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self { text: None, languages: Mutex::new(Vec::new()) })
        }

        pub(crate) fn calls(&self) -> usize {
            self.languages.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OcrTextSource for StubOcr {
        async fn recognize(&self, _data: &[u8], language: &str) -> crate::ocr::Result<String> {
            self.languages.lock().unwrap().push(language.to_string());
            self.text
                .clone()
                .ok_or_else(|| OcrError::Recognition("stub failure".to_string()))
        }
    }

    #[tokio::test]
    async fn test_pdf_text_layer_used() {
        let pdf = StubPdf::returning("CHAVE: 414979709");
        let ocr = StubOcr::returning("from ocr");
        let orchestrator = ExtractionOrchestrator::new(pdf.clone(), ocr.clone());

        let text = orchestrator.extract_text(b"%PDF-1.4 ...", "eng").await;
        assert_eq!(text, "CHAVE: 414979709");
        assert_eq!(ocr.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_pdf_text_falls_back_to_ocr() {
        let pdf = StubPdf::returning("  \n ");
        let ocr = StubOcr::returning("CHAVE: 414979709 PIN: 86612413");
        let orchestrator = ExtractionOrchestrator::new(pdf.clone(), ocr.clone());

        let text = orchestrator.extract_text(b"%PDF-1.7 scanned", "eng").await;
        assert_eq!(text, "CHAVE: 414979709 PIN: 86612413");
        assert_eq!(*pdf.calls.lock().unwrap(), 1);
        assert_eq!(ocr.calls(), 1);
    }

    #[tokio::test]
    async fn test_pdf_error_falls_back_to_ocr() {
        let ocr = StubOcr::returning("recovered");
        let orchestrator = ExtractionOrchestrator::new(StubPdf::failing(), ocr.clone());

        assert_eq!(orchestrator.extract_text(b"%PDF-broken", "eng").await, "recovered");
    }

    #[tokio::test]
    async fn test_non_pdf_goes_straight_to_ocr_with_language() {
        let pdf = StubPdf::returning("should not be used");
        let ocr = StubOcr::returning("photo text");
        let orchestrator = ExtractionOrchestrator::new(pdf.clone(), ocr.clone());

        let text = orchestrator.extract_text(b"\xff\xd8\xff\xe0 jpeg", "por").await;
        assert_eq!(text, "photo text");
        assert_eq!(*pdf.calls.lock().unwrap(), 0);
        assert_eq!(*ocr.languages.lock().unwrap(), vec!["por".to_string()]);
    }

    #[tokio::test]
    async fn test_total_failure_is_empty_text() {
        let orchestrator = ExtractionOrchestrator::new(StubPdf::failing(), StubOcr::failing());
        assert_eq!(orchestrator.extract_text(b"%PDF-1.4", "eng").await, "");
        assert_eq!(orchestrator.extract_text(b"GIF89a", "eng").await, "");
    }
}
