//! CLI module for the ragchat binary.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::warn;

use crate::models::DEFAULT_OWNER;
use output::OutputFormat;

/// Ask questions against document stores with retrieval-augmented generation.
#[derive(Debug, Parser)]
#[command(name = "ragchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, default_value = DEFAULT_OWNER, help = "Owner of stores and providers")]
    pub owner: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show configuration, providers and store sizes
    Status,

    /// Build or rebuild store vectors
    #[command(subcommand)]
    Store(commands::StoreCommand),

    /// Answer a question from a store's knowledge
    Ask(commands::AskArgs),

    /// Inspect configured providers
    #[command(subcommand)]
    Provider(commands::ProviderCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM. A handler that cannot be installed
/// never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["ragchat", "ask", "what is rust?", "--store", "docs", "--sse"])
            .unwrap();
        assert_eq!(cli.owner, "admin");
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.question, "what is rust?");
                assert_eq!(args.store.as_deref(), Some("docs"));
                assert!(args.sse);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_store_refresh_default() {
        let cli = Cli::try_parse_from(["ragchat", "-f", "json", "store", "refresh"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Store(commands::StoreCommand::Refresh { store: None })
        ));
    }
}
