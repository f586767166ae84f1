//! Provider lookup and validation shared by the embedding and model factories.

use crate::error::ConfigError;
use crate::models::{DUMMY_PROVIDER_TYPE, ProviderCategory, ProviderConfig};
use crate::repository::ProviderRepository;
use crate::utils::resolve_secret;

/// Find a provider by name, or the category default when `name` is empty, and
/// check it can serve `category`. The returned config carries the resolved secret.
pub async fn lookup_provider(
    repo: &dyn ProviderRepository,
    owner: &str,
    name: &str,
    category: ProviderCategory,
) -> Result<ProviderConfig, ConfigError> {
    let found = if name.is_empty() {
        repo.get_default_provider(category).await?
    } else {
        repo.get_provider(owner, name).await?
    };

    let Some(mut provider) = found else {
        if name.is_empty() {
            return Err(ConfigError::NoDefaultProvider {
                article: category.article(),
                category: category.noun().to_string(),
            });
        }
        return Err(ConfigError::ProviderNotFound {
            category: category.noun().to_string(),
            name: name.to_string(),
        });
    };

    if provider.category != category.as_str() {
        return Err(ConfigError::CategoryMismatch {
            id: provider.id(),
            expected: category.as_str().to_string(),
            actual: provider.category.clone(),
        });
    }

    provider.client_secret = resolve_secret(&provider.client_secret);
    if provider.client_secret.is_empty() && provider.provider_type != DUMMY_PROVIDER_TYPE {
        return Err(ConfigError::MissingSecret(provider.id()));
    }

    Ok(provider)
}
