use anyhow::Result;
use clap::Parser;

use ragchat::cli::commands::{
    AppContext, handle_ask, handle_config, handle_provider, handle_status, handle_store,
};
use ragchat::cli::output::OutputFormat;
use ragchat::cli::{Cli, Commands};
use ragchat::models::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets referenced as $VAR may live in a local .env file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    ragchat::logging::init(cli.verbose);

    let format = cli.format.unwrap_or_default();
    run_command(cli.command, &cli.owner, format, cli.verbose).await
}

async fn run_command(
    command: Commands,
    owner: &str,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    if let Commands::Config(cmd) = command {
        return handle_config(cmd, format).await;
    }

    let ctx = AppContext::open(Config::load()?)?;
    match command {
        Commands::Status => handle_status(&ctx, format, verbose).await?,
        Commands::Store(cmd) => handle_store(cmd, &ctx, owner, format).await?,
        Commands::Ask(args) => handle_ask(args, &ctx, owner, format).await?,
        Commands::Provider(cmd) => handle_provider(cmd, &ctx, owner, format).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}
