mod ask;
mod config;
mod provider;
mod status;
mod store;

pub use ask::AskArgs;
pub use config::ConfigCommand;
pub use provider::ProviderCommand;
pub use store::StoreCommand;

pub use ask::handle_ask;
pub use config::handle_config;
pub use provider::handle_provider;
pub use status::handle_status;
pub use store::handle_store;

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::http::build_http_client;
use crate::models::Config;
use crate::repository::{ConfigRepository, SqliteRepository};

/// Everything a command needs: configuration, the shared HTTP client, the
/// provider/store catalog and the vector/message database.
pub struct AppContext {
    pub config: Config,
    pub client: Client,
    pub catalog: Arc<ConfigRepository>,
    pub records: Arc<SqliteRepository>,
}

impl AppContext {
    pub fn open(config: Config) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        let catalog = Arc::new(ConfigRepository::from_config(&config));
        let path = config
            .database_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine data directory"))?;
        let records = Arc::new(
            SqliteRepository::open(&path)
                .with_context(|| format!("failed to open database {}", path.display()))?,
        );
        Ok(Self {
            config,
            client,
            catalog,
            records,
        })
    }
}
