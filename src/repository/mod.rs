//! Persistence collaborator: keyed records addressed by `owner/name`.

mod config;
mod memory;
mod sqlite;

pub use config::ConfigRepository;
pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::models::{Message, ProviderCategory, ProviderConfig, StoreConfig, Vector};

#[async_trait]
pub trait VectorRepository: Send + Sync {
    async fn add_vector(&self, vector: &Vector) -> Result<(), RepositoryError>;

    /// Vectors of one store in insertion order.
    async fn get_vectors(&self, owner: &str, store: &str) -> Result<Vec<Vector>, RepositoryError>;

    /// Remove every vector of a store, returning how many were deleted.
    async fn delete_store_vectors(&self, owner: &str, store: &str)
    -> Result<usize, RepositoryError>;

    async fn count_vectors(&self, owner: &str, store: &str) -> Result<usize, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn add_message(&self, message: &Message) -> Result<(), RepositoryError>;

    async fn get_message(&self, owner: &str, name: &str)
    -> Result<Option<Message>, RepositoryError>;

    /// Overwrite a stored message. Last writer wins; returns false when no such
    /// message exists.
    async fn update_message(&self, message: &Message) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ProviderRepository: Send + Sync {
    async fn get_provider(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<ProviderConfig>, RepositoryError>;

    /// The provider flagged as default for a category, else the first one of it.
    async fn get_default_provider(
        &self,
        category: ProviderCategory,
    ) -> Result<Option<ProviderConfig>, RepositoryError>;

    async fn list_providers(&self) -> Result<Vec<ProviderConfig>, RepositoryError>;
}

#[async_trait]
pub trait StoreRepository: Send + Sync {
    async fn get_store(&self, owner: &str, name: &str)
    -> Result<Option<StoreConfig>, RepositoryError>;

    /// The owner's store flagged as default, else the owner's first store.
    async fn get_default_store(&self, owner: &str) -> Result<Option<StoreConfig>, RepositoryError>;

    async fn list_stores(&self) -> Result<Vec<StoreConfig>, RepositoryError>;
}
