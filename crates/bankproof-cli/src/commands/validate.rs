//! Validate command - confirm a typed key/pin pair.

use clap::Args;
use tracing::info;

use bankproof_core::{BankProof, CodeInput, ProviderRegistry};

use super::{load_config, print_outcome, request_context};

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Receipt key ("chave")
    #[arg(short, long)]
    key: String,

    /// Receipt pin
    #[arg(short, long)]
    pin: String,

    /// Provider name (default: from config)
    #[arg(long)]
    provider: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

pub async fn run(args: ValidateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = ProviderRegistry::from_config(&config)?;

    let name = args
        .provider
        .as_deref()
        .unwrap_or(&config.verification.default_provider);
    let provider = registry.get(name)?;
    info!("Validating codes with provider {}", provider.name());

    let ctx = request_context(&config, args.timeout_ms, None);
    let input = CodeInput::new(args.key, args.pin);
    let outcome = BankProof::validate_codes(&input, provider.as_ref(), &ctx).await;

    print_outcome(&outcome)
}
