use anyhow::Result;

use super::AppContext;
use crate::cli::output::{OutputFormat, StatusInfo, StoreStatus, get_formatter};
use crate::models::Config;
use crate::repository::{ProviderRepository, StoreRepository, VectorRepository};

pub async fn handle_status(ctx: &AppContext, format: OutputFormat, verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);
    let providers = ctx.catalog.list_providers().await?;

    let mut stores = Vec::new();
    for store in ctx.catalog.list_stores().await? {
        let vectors = ctx.records.count_vectors(&store.owner, &store.name).await?;
        let source = match (&store.storage_root, &store.storage_url) {
            (Some(root), _) => root.join(&store.prefix).display().to_string(),
            (None, Some(url)) => format!("{url} (prefix: {:?})", store.prefix),
            (None, None) => "(no storage)".to_string(),
        };
        stores.push(StoreStatus {
            id: store.id(),
            source,
            model_provider: store.model_provider.clone(),
            embedding_provider: store.embedding_provider.clone(),
            vectors,
            is_default: store.is_default,
        });
    }

    let status = StatusInfo {
        config_path: Config::config_path().map(|p| p.display().to_string()),
        database_path: ctx.config.database_path().map(|p| p.display().to_string()),
        providers: providers.len(),
        stores,
    };
    print!("{}", formatter.format_status(&status));

    if verbose && providers.is_empty() {
        eprintln!();
        eprintln!("Hint: no providers configured. Create a starter config with: ragchat config init");
    }

    Ok(())
}
