use anyhow::Result;
use clap::Subcommand;

use super::AppContext;
use crate::cli::output::{OutputFormat, get_formatter};
use crate::models::{ProviderCategory, TypingPace};
use crate::repository::ProviderRepository;
use crate::services::{create_model_provider, lookup_provider};

#[derive(Debug, Subcommand)]
pub enum ProviderCommand {
    #[command(about = "List configured providers")]
    List,
    #[command(about = "Show the price list of a model provider")]
    Pricing {
        #[arg(help = "Provider name (default model provider if omitted)")]
        name: Option<String>,
    },
}

pub async fn handle_provider(
    cmd: ProviderCommand,
    ctx: &AppContext,
    owner: &str,
    format: OutputFormat,
) -> Result<()> {
    let formatter = get_formatter(format);
    match cmd {
        ProviderCommand::List => {
            let providers = ctx.catalog.list_providers().await?;
            print!("{}", formatter.format_providers(&providers));
        }
        ProviderCommand::Pricing { name } => {
            let provider = lookup_provider(
                ctx.catalog.as_ref(),
                owner,
                name.as_deref().unwrap_or(""),
                ProviderCategory::Model,
            )
            .await?;
            let backend = create_model_provider(&provider, ctx.client.clone(), TypingPace::Auto)?;
            println!("{}", formatter.format_message(backend.pricing_summary()));
        }
    }
    Ok(())
}
