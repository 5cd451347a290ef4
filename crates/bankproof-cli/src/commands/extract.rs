//! Extract command - find a provider's codes in a document without verifying them.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use bankproof_core::{BankProof, ProviderRegistry};

use super::{load_config, request_context, warn_if_models_missing};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Provider whose code patterns are used (default: from config)
    #[arg(long)]
    provider: Option<String>,

    /// OCR language hint (ISO 639-2)
    #[arg(short, long)]
    language: Option<String>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let registry = ProviderRegistry::from_config(&config)?;
    let name = args
        .provider
        .as_deref()
        .unwrap_or(&config.verification.default_provider);
    let provider = registry.get(name)?;

    info!("Extracting {} codes from {}", provider.name(), args.input.display());
    let data = fs::read(&args.input)?;

    let ctx = request_context(&config, None, args.language.as_deref());
    warn_if_models_missing(&config, &ctx);
    let codes = BankProof::native(&config)
        .extract_codes(data, provider.patterns(), &ctx)
        .await;

    println!("{}", serde_json::to_string_pretty(&codes)?);
    if !codes.is_complete() {
        eprintln!("{} Key or pin not found in document", style("ℹ").blue());
    }
    Ok(())
}
