//! Check command - extract codes from a receipt and verify them.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use tracing::{debug, info};

use bankproof_core::{BankProof, ProviderRegistry};

use super::{load_config, print_outcome, request_context, warn_if_models_missing};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Receipt file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Provider name (default: from config)
    #[arg(long)]
    provider: Option<String>,

    /// OCR language hint (ISO 639-2)
    #[arg(short, long)]
    language: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

pub async fn run(args: CheckArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
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

    info!("Checking receipt {} with {}", args.input.display(), provider.name());
    let data = fs::read(&args.input)?;

    let ctx = request_context(&config, args.timeout_ms, args.language.as_deref());
    warn_if_models_missing(&config, &ctx);
    let outcome = BankProof::native(&config)
        .extract_and_validate(data, provider.as_ref(), &ctx)
        .await;

    debug!("Total processing time: {:?}", start.elapsed());
    print_outcome(&outcome)
}
