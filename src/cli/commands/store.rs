use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};

use super::AppContext;
use crate::cli::output::{IngestSummary, OutputFormat, get_formatter};
use crate::cli::shutdown_signal;
use crate::error::IngestError;
use crate::services::{
    EmbeddingRateLimiter, IngestPipeline, resolve_embedding_provider, resolve_store,
};
use crate::storage::storage_for_store;
use crate::utils::CancelToken;

#[derive(Debug, Subcommand)]
pub enum StoreCommand {
    #[command(about = "Embed every text document of a store")]
    Ingest {
        #[arg(help = "Store name (default store if omitted)")]
        store: Option<String>,
    },
    #[command(about = "Delete a store's vectors and embed its documents again")]
    Refresh {
        #[arg(help = "Store name (default store if omitted)")]
        store: Option<String>,
    },
}

pub async fn handle_store(
    cmd: StoreCommand,
    ctx: &AppContext,
    owner: &str,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        StoreCommand::Ingest { store } => {
            run_ingest(ctx, owner, store.as_deref().unwrap_or(""), false, format).await
        }
        StoreCommand::Refresh { store } => {
            run_ingest(ctx, owner, store.as_deref().unwrap_or(""), true, format).await
        }
    }
}

async fn run_ingest(
    ctx: &AppContext,
    owner: &str,
    name: &str,
    refresh: bool,
    format: OutputFormat,
) -> Result<()> {
    let formatter = get_formatter(format);
    let store = resolve_store(ctx.catalog.as_ref(), owner, name).await?;
    let storage = storage_for_store(&store, ctx.client.clone())?;
    let (provider, embedder) = resolve_embedding_provider(
        ctx.catalog.as_ref(),
        owner,
        &store.embedding_provider,
        ctx.client.clone(),
    )
    .await?;
    let limiter = EmbeddingRateLimiter::from_config(&ctx.config.ingestion)?;

    let pipeline = IngestPipeline::new(
        Arc::from(storage),
        Arc::from(embedder),
        ctx.records.clone(),
        Arc::new(limiter),
        &ctx.config.ingestion,
    );

    let (handle, token) = CancelToken::new();
    let watcher = tokio::spawn(async move {
        shutdown_signal().await;
        handle.cancel();
    });

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!(
        "Embedding {} with {} ...",
        store.id(),
        provider.id()
    ));
    pb.enable_steady_tick(Duration::from_millis(120));

    let start = Instant::now();
    let result = if refresh {
        pipeline
            .refresh(&store.owner, &store.name, &store.prefix, &token)
            .await
    } else {
        pipeline
            .ingest(&store.owner, &store.name, &store.prefix, &token)
            .await
    };
    watcher.abort();
    pb.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(IngestError::Cancelled) => {
            eprintln!("Ingestion cancelled. Vectors written so far were kept.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let summary = IngestSummary {
        store: store.id(),
        refreshed: refresh,
        report,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    print!("{}", formatter.format_ingest(&summary));
    Ok(())
}
