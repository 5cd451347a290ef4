//! Providers command - list registered verification providers.

use bankproof_core::ProviderRegistry;

use super::load_config;

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = ProviderRegistry::from_config(&config)?;

    for name in registry.names() {
        if name.eq_ignore_ascii_case(&config.verification.default_provider) {
            println!("{} (default)", name);
        } else {
            println!("{}", name);
        }
    }

    Ok(())
}
