//! Configuration structures for the extraction and verification pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::provider::bai::BAI_ENDPOINT;

/// Main configuration for the bankproof pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BankProofConfig {
    /// Verification provider configuration.
    pub verification: VerificationConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,
}

/// Verification provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Timeout for a single verification request, in milliseconds.
    pub timeout_ms: u64,

    /// Provider used when none is named on the command line.
    pub default_provider: String,

    /// Endpoint of the BAI confirmation authority.
    pub bai_endpoint: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            default_provider: "BAI".to_string(),
            bai_endpoint: BAI_ENDPOINT.to_string(),
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Default language hint passed to the OCR engine.
    pub language: String,

    /// Text detection model file name.
    pub detection_model: String,

    /// Character dictionary file name (per recognition family, `{family}` is substituted).
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them with spaces.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            language: "eng".to_string(),
            detection_model: "det.onnx".to_string(),
            dictionary: "{family}_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Recognition model file name for a model family.
    pub fn recognition_model(&self, family: &str) -> String {
        format!("{}_rec.onnx", family)
    }

    /// Dictionary file name for a model family.
    pub fn dictionary_for(&self, family: &str) -> String {
        self.dictionary.replace("{family}", family)
    }

    /// Full path to a file in the model directory.
    pub fn model_path(&self, file_name: &str) -> PathBuf {
        self.model_dir.join(file_name)
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Try the empty password on encrypted PDFs before giving up.
    pub decrypt_empty_password: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            decrypt_empty_password: true,
        }
    }
}

impl BankProofConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.ocr.model_path(model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: BankProofConfig =
            serde_json::from_str(r#"{"verification": {"timeout_ms": 1500}}"#).unwrap();
        assert_eq!(config.verification.timeout_ms, 1500);
        assert_eq!(config.verification.default_provider, "BAI");
        assert_eq!(config.ocr.language, "eng");
        assert!(config.pdf.decrypt_empty_password);
    }

    #[test]
    fn test_model_file_names() {
        let config = BankProofConfig::default();
        assert_eq!(config.ocr.recognition_model("latin"), "latin_rec.onnx");
        assert_eq!(config.ocr.dictionary_for("latin"), "latin_dict.txt");
        assert_eq!(config.model_path("det.onnx"), PathBuf::from("models/det.onnx"));
    }
}
