use async_trait::async_trait;

use super::{ProviderRepository, StoreRepository};
use crate::error::RepositoryError;
use crate::models::{Config, ProviderCategory, ProviderConfig, StoreConfig};

/// Read-only provider and store records taken from the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigRepository {
    providers: Vec<ProviderConfig>,
    stores: Vec<StoreConfig>,
}

impl ConfigRepository {
    pub fn new(providers: Vec<ProviderConfig>, stores: Vec<StoreConfig>) -> Self {
        Self { providers, stores }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.providers.clone(), config.stores.clone())
    }
}

#[async_trait]
impl ProviderRepository for ConfigRepository {
    async fn get_provider(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<ProviderConfig>, RepositoryError> {
        Ok(self
            .providers
            .iter()
            .find(|p| p.owner == owner && p.name == name)
            .cloned())
    }

    async fn get_default_provider(
        &self,
        category: ProviderCategory,
    ) -> Result<Option<ProviderConfig>, RepositoryError> {
        let mut in_category = self
            .providers
            .iter()
            .filter(|p| p.category == category.as_str());
        let first = in_category.clone().next();
        Ok(in_category.find(|p| p.is_default).or(first).cloned())
    }

    async fn list_providers(&self) -> Result<Vec<ProviderConfig>, RepositoryError> {
        Ok(self.providers.clone())
    }
}

#[async_trait]
impl StoreRepository for ConfigRepository {
    async fn get_store(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<StoreConfig>, RepositoryError> {
        Ok(self
            .stores
            .iter()
            .find(|s| s.owner == owner && s.name == name)
            .cloned())
    }

    async fn get_default_store(&self, owner: &str) -> Result<Option<StoreConfig>, RepositoryError> {
        let mut owned = self.stores.iter().filter(|s| s.owner == owner);
        let first = owned.clone().next();
        Ok(owned.find(|s| s.is_default).or(first).cloned())
    }

    async fn list_stores(&self) -> Result<Vec<StoreConfig>, RepositoryError> {
        Ok(self.stores.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> ConfigRepository {
        ConfigRepository::new(
            vec![
                ProviderConfig::new("emb-a", ProviderCategory::Embedding, "Dummy", "dummy"),
                ProviderConfig::new("gpt", ProviderCategory::Model, "OpenAI", "gpt-4"),
                ProviderConfig::new("emb-b", ProviderCategory::Embedding, "OpenAI", "ada")
                    .as_default(),
            ],
            vec![StoreConfig::new("first"), StoreConfig::new("second")],
        )
    }

    #[tokio::test]
    async fn test_default_provider_prefers_flag() {
        let repo = repo();
        let p = repo
            .get_default_provider(ProviderCategory::Embedding)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(p.name, "emb-b");

        let p = repo
            .get_default_provider(ProviderCategory::Model)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(p.name, "gpt");
    }

    #[tokio::test]
    async fn test_default_store_falls_back_to_first() {
        let repo = repo();
        let s = repo.get_default_store("admin").await.unwrap().unwrap();
        assert_eq!(s.name, "first");
        assert!(repo.get_default_store("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_provider_by_id() {
        let repo = repo();
        assert!(repo.get_provider("admin", "gpt").await.unwrap().is_some());
        assert!(repo.get_provider("admin", "missing").await.unwrap().is_none());
    }
}
