//! Error types for the bankproof-core library.
//!
//! Expected verification failures never show up here: they are reported as
//! [`VerificationOutcome`](crate::models::outcome::VerificationOutcome) values. These
//! errors cover collaborator failures (absorbed by the pipeline) and
//! construction/configuration problems.

use thiserror::Error;

/// Main error type for the bankproof library.
#[derive(Error, Debug)]
pub enum BankProofError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Transport error talking to a verification authority.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No provider registered under the requested name.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF text-layer extraction.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text detection or recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The document contains nothing OCR can read.
    #[error("no images found in document")]
    NoImages,

    /// The blocking OCR task did not complete.
    #[error("OCR task failed: {0}")]
    Task(String),
}

/// Errors raised by a [`Transport`](crate::provider::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The request could not be sent or the response body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The request timed out inside the HTTP client.
    #[error("request timed out")]
    Timeout,

    /// The request was abandoned because its cancellation token fired.
    #[error("request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Client(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Result type for the bankproof library.
pub type Result<T> = std::result::Result<T, BankProofError>;
