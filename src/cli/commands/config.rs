use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::{OutputFormat, get_formatter};
use crate::models::{Config, ProviderCategory, ProviderConfig, StoreConfig};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a starter configuration file")]
    Init {
        #[arg(long, short = 'f', help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file path")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(force, format),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path => handle_path(),
    }
}

/// Offline starter setup: dummy backends and a store over `./docs`.
fn starter_config() -> Config {
    let mut store = StoreConfig::new("docs");
    store.storage_root = Some(std::path::PathBuf::from("docs"));
    store.is_default = true;

    Config {
        providers: vec![
            ProviderConfig::new("dummy-model", ProviderCategory::Model, "Dummy", "").as_default(),
            ProviderConfig::new("dummy-embedding", ProviderCategory::Embedding, "Dummy", "")
                .as_default(),
        ],
        stores: vec![store],
        ..Config::default()
    }
}

fn handle_init(force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config_path =
        Config::config_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    starter_config()
        .save()
        .context("failed to write config")?;
    println!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", config_path.display()))
    );
    Ok(())
}

/// Secrets that are not environment references are masked.
fn redacted(mut config: Config) -> Config {
    for provider in &mut config.providers {
        if !provider.client_secret.is_empty() && !provider.client_secret.starts_with('$') {
            provider.client_secret = "********".to_string();
        }
    }
    config
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let config = redacted(Config::load()?);
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = Config::config_path() {
        println!("# Config: {}", path.display());
        println!();
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn handle_path() -> Result<()> {
    let path =
        Config::config_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_config_is_valid() {
        let config = starter_config();
        config.validate().unwrap();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.providers.len(), 2);
        assert!(parsed.stores[0].is_default);
    }

    #[test]
    fn test_redacted_keeps_env_references() {
        let mut config = starter_config();
        config.providers[0].client_secret = "sk-live".to_string();
        config.providers[1].client_secret = "$OPENAI_API_KEY".to_string();
        let config = redacted(config);
        assert_eq!(config.providers[0].client_secret, "********");
        assert_eq!(config.providers[1].client_secret, "$OPENAI_API_KEY");
    }
}
