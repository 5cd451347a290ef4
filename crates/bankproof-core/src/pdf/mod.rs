//! PDF processing module.

mod extractor;

pub use extractor::{PdfDocument, PdfTextExtractor};

use async_trait::async_trait;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Source of a PDF's embedded text layer.
///
/// Implementations return an empty string for a document that parsed but has
/// no text (a scanned PDF); errors are reserved for unreadable documents.
#[async_trait]
pub trait PdfTextSource: Send + Sync {
    async fn extract_text(&self, data: &[u8]) -> Result<String>;
}
