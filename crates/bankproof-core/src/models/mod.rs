//! Data models shared across the pipeline.

pub mod config;
pub mod outcome;

pub use config::{BankProofConfig, OcrConfig, PdfConfig, VerificationConfig};
pub use outcome::{reasons, VerificationOutcome, VerificationStatus};
