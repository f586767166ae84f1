//! Embedding providers: text in, fixed-dimension vector out.

mod dummy;
mod huggingface;
mod openai;

pub use dummy::DummyEmbeddingProvider;
pub use huggingface::HuggingFaceEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{ConfigError, EmbeddingError};
use crate::models::{ProviderCategory, ProviderConfig};
use crate::repository::ProviderRepository;
use crate::services::provider::lookup_provider;

/// Turns text into a vector. Every call on one instance returns the same
/// dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn query_vector(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Model identifier used for requests.
    fn model(&self) -> &str;
}

/// Build the backend for a provider record, keyed by its type.
pub fn create_embedding_provider(
    provider: &ProviderConfig,
    client: Client,
) -> Result<Box<dyn EmbeddingProvider>, ConfigError> {
    match provider.provider_type.as_str() {
        "OpenAI" => Ok(Box::new(OpenAiEmbeddingProvider::openai(client, provider))),
        "Azure" => Ok(Box::new(OpenAiEmbeddingProvider::azure(client, provider)?)),
        "Local" => Ok(Box::new(OpenAiEmbeddingProvider::local(client, provider)?)),
        "Hugging Face" => Ok(Box::new(HuggingFaceEmbeddingProvider::new(client, provider))),
        "Dummy" => Ok(Box::new(DummyEmbeddingProvider::from_config(provider))),
        other => Err(ConfigError::UnsupportedProviderType {
            category: ProviderCategory::Embedding.noun().to_string(),
            provider_type: other.to_string(),
        }),
    }
}

/// Look up, validate and build an embedding provider. An empty `name` picks the
/// default one.
pub async fn resolve_embedding_provider(
    repo: &dyn ProviderRepository,
    owner: &str,
    name: &str,
    client: Client,
) -> Result<(ProviderConfig, Box<dyn EmbeddingProvider>), ConfigError> {
    let provider = lookup_provider(repo, owner, name, ProviderCategory::Embedding).await?;
    let backend = create_embedding_provider(&provider, client)?;
    Ok((provider, backend))
}

/// Map a transport failure onto the embedding error taxonomy.
pub(crate) fn classify_request_error(e: reqwest::Error) -> EmbeddingError {
    if e.is_timeout() {
        EmbeddingError::Timeout
    } else if e.is_connect() {
        EmbeddingError::ConnectionError(e.to_string())
    } else {
        EmbeddingError::RequestError(e)
    }
}

/// Turn a non-success response into a server error carrying status and body.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, EmbeddingError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(EmbeddingError::ServerError(format!("status {status}: {body}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ConfigRepository;

    #[test]
    fn test_factory_rejects_unknown_type() {
        let provider = ProviderConfig::new("x", ProviderCategory::Embedding, "Cohere", "embed")
            .with_secret("k");
        let err = create_embedding_provider(&provider, Client::new()).err().unwrap();
        assert_eq!(
            err.to_string(),
            "unsupported embedding provider type: Cohere"
        );
    }

    #[test]
    fn test_local_requires_url() {
        let provider = ProviderConfig::new("x", ProviderCategory::Embedding, "Local", "bge")
            .with_secret("k");
        assert!(create_embedding_provider(&provider, Client::new()).is_err());

        let provider = provider.with_url("http://localhost:8080/v1");
        assert!(create_embedding_provider(&provider, Client::new()).is_ok());
    }

    #[tokio::test]
    async fn test_resolve_default_dummy() {
        let repo = ConfigRepository::new(
            vec![ProviderConfig::new(
                "dummy",
                ProviderCategory::Embedding,
                "Dummy",
                "",
            )],
            vec![],
        );
        let (config, backend) = resolve_embedding_provider(&repo, "admin", "", Client::new())
            .await
            .unwrap();
        assert_eq!(config.name, "dummy");
        let v = backend.query_vector("hello world").await.unwrap();
        assert!(!v.is_empty());
    }
}
