//! Core library for bank transfer receipt verification.
//!
//! This crate provides:
//! - Document text extraction (PDF text layer with OCR fallback)
//! - Key/pin code extraction from receipt text
//! - Verification against bank confirmation authorities (BAI)
//! - Per-request timeout, cancellation and logging through [`RequestContext`]

pub mod context;
pub mod document;
pub mod error;
pub mod extraction;
pub mod facade;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod provider;

pub use context::RequestContext;
pub use error::{BankProofError, OcrError, PdfError, Result, TransportError};
pub use extraction::{ExtractedCodes, ExtractionOrchestrator, PatternSet};
pub use facade::{BankProof, CodeInput};
pub use models::config::BankProofConfig;
pub use models::outcome::{reasons, VerificationOutcome, VerificationStatus};
pub use provider::{ProviderRegistry, VerificationProvider};
