//! CLI subcommands.

pub mod check;
pub mod config;
pub mod extract;
pub mod providers;
pub mod validate;

use std::path::{Path, PathBuf};

use console::style;
use tracing::{debug, warn};

use bankproof_core::models::outcome::{VerificationOutcome, VerificationStatus};
use bankproof_core::ocr::PureOcrEngine;
use bankproof_core::{BankProofConfig, RequestContext};

/// `<config_dir>/bankproof/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bankproof")
        .join("config.json")
}

/// Load the explicit config file, else the default one if it exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<BankProofConfig> {
    if let Some(path) = config_path {
        let path = Path::new(path);
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        debug!("Loading config from {}", path.display());
        return Ok(BankProofConfig::from_file(path)?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(BankProofConfig::from_file(&default_path)?)
    } else {
        Ok(BankProofConfig::default())
    }
}

/// Request context carrying the CLI's logger and the effective timeout.
pub fn request_context(
    config: &BankProofConfig,
    timeout_ms: Option<u64>,
    language: Option<&str>,
) -> RequestContext {
    RequestContext::new()
        .with_current_logger()
        .with_timeout_ms(timeout_ms.unwrap_or(config.verification.timeout_ms))
        .with_language(language.unwrap_or(&config.ocr.language))
}

/// Scanned receipts need OCR models; say so up front instead of failing silently.
pub fn warn_if_models_missing(config: &BankProofConfig, ctx: &RequestContext) {
    let engine = PureOcrEngine::new(config.ocr.clone(), config.pdf.clone());
    if !engine.models_available(ctx.language()) {
        warn!(
            "OCR models not found in {}, only PDF text layers can be read",
            config.ocr.model_dir.display()
        );
    }
}

/// Print the outcome as JSON on stdout and a short summary on stderr.
pub fn print_outcome(outcome: &VerificationOutcome) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);

    let marker = match outcome.status {
        VerificationStatus::Confirmed => style("✓").green(),
        VerificationStatus::Invalid => style("✗").red(),
        VerificationStatus::Error => style("!").yellow(),
    };
    match &outcome.message {
        Some(message) => eprintln!("{} {} ({}): {}", marker, outcome.status, outcome.provider, message),
        None => eprintln!("{} {} ({})", marker, outcome.status, outcome.provider),
    }

    Ok(())
}
