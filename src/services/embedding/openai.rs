use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::{EmbeddingProvider, check_status, classify_request_error};
use crate::error::{ConfigError, EmbeddingError};
use crate::models::ProviderConfig;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
enum Auth {
    Bearer(String),
    ApiKey(String),
}

/// OpenAI-style `/embeddings` endpoint. Covers OpenAI itself, Azure deployments
/// and self-hosted compatible servers.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    client: Client,
    url: String,
    auth: Auth,
    model: String,
}

fn model_or_default(provider: &ProviderConfig) -> String {
    if provider.sub_type.is_empty() {
        DEFAULT_MODEL.to_string()
    } else {
        provider.sub_type.clone()
    }
}

fn required_url(provider: &ProviderConfig) -> Result<String, ConfigError> {
    provider
        .provider_url
        .as_deref()
        .map(|u| u.trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "provider {} requires a provider_url",
                provider.id()
            ))
        })
}

impl OpenAiEmbeddingProvider {
    pub fn openai(client: Client, provider: &ProviderConfig) -> Self {
        let base = provider
            .provider_url
            .as_deref()
            .unwrap_or(OPENAI_BASE_URL)
            .trim_end_matches('/');
        Self {
            client,
            url: format!("{base}/embeddings"),
            auth: Auth::Bearer(provider.client_secret.clone()),
            model: model_or_default(provider),
        }
    }

    pub fn azure(client: Client, provider: &ProviderConfig) -> Result<Self, ConfigError> {
        let endpoint = required_url(provider)?;
        let model = model_or_default(provider);
        let deployment = provider.deployment_name.clone().unwrap_or_else(|| model.clone());
        let version = provider
            .api_version
            .as_deref()
            .unwrap_or(DEFAULT_AZURE_API_VERSION);
        Ok(Self {
            client,
            url: format!(
                "{endpoint}/openai/deployments/{deployment}/embeddings?api-version={version}"
            ),
            auth: Auth::ApiKey(provider.client_secret.clone()),
            model,
        })
    }

    pub fn local(client: Client, provider: &ProviderConfig) -> Result<Self, ConfigError> {
        let base = required_url(provider)?;
        Ok(Self {
            client,
            url: format!("{base}/embeddings"),
            auth: Auth::Bearer(provider.client_secret.clone()),
            model: model_or_default(provider),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) if token.is_empty() => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::ApiKey(key) => request.header("api-key", key),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn query_vector(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            input: [text],
            model: &self.model,
        };

        let response = self
            .authorize(self.client.post(&self.url))
            .json(&request)
            .send()
            .await
            .map_err(classify_request_error)?;

        let body: EmbeddingResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderCategory;

    #[test]
    fn test_azure_url() {
        let mut provider =
            ProviderConfig::new("az", ProviderCategory::Embedding, "Azure", "text-embedding-3")
                .with_secret("k")
                .with_url("https://acme.openai.azure.com/");
        provider.deployment_name = Some("emb".into());
        let backend = OpenAiEmbeddingProvider::azure(Client::new(), &provider).unwrap();
        assert_eq!(
            backend.url,
            "https://acme.openai.azure.com/openai/deployments/emb/embeddings?api-version=2023-05-15"
        );
    }

    #[test]
    fn test_openai_defaults() {
        let provider = ProviderConfig::new("oa", ProviderCategory::Embedding, "OpenAI", "");
        let backend = OpenAiEmbeddingProvider::openai(Client::new(), &provider);
        assert_eq!(backend.url, "https://api.openai.com/v1/embeddings");
        assert_eq!(backend.model(), "text-embedding-ada-002");
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(EmbeddingRequest {
            input: ["hi"],
            model: "m",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"input": ["hi"], "model": "m"}));
    }
}
