use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{EmbeddingProvider, check_status, classify_request_error};
use crate::error::EmbeddingError;
use crate::models::ProviderConfig;

const INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/pipeline/feature-extraction";

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: [&'a str; 1],
}

/// Hugging Face inference API, feature-extraction pipeline.
#[derive(Debug, Clone)]
pub struct HuggingFaceEmbeddingProvider {
    client: Client,
    url: String,
    token: String,
    model: String,
}

impl HuggingFaceEmbeddingProvider {
    pub fn new(client: Client, provider: &ProviderConfig) -> Self {
        let base = provider
            .provider_url
            .as_deref()
            .unwrap_or(INFERENCE_BASE_URL)
            .trim_end_matches('/');
        Self {
            client,
            url: format!("{base}/{}", provider.sub_type),
            token: provider.client_secret.clone(),
            model: provider.sub_type.clone(),
        }
    }
}

/// The pipeline returns one vector per input, or one vector per token for models
/// without pooling. Token vectors are mean-pooled.
fn first_embedding(value: serde_json::Value) -> Result<Vec<f32>, EmbeddingError> {
    let invalid = |msg: &str| EmbeddingError::InvalidResponse(msg.to_string());

    let first = value
        .as_array()
        .and_then(|items| items.first())
        .ok_or_else(|| invalid("empty embedding response"))?;

    let as_vector = |v: &serde_json::Value| -> Option<Vec<f32>> {
        v.as_array()?
            .iter()
            .map(|x| x.as_f64().map(|f| f as f32))
            .collect()
    };

    if let Some(vector) = as_vector(first) {
        return Ok(vector);
    }

    let tokens: Vec<Vec<f32>> = first
        .as_array()
        .ok_or_else(|| invalid("unexpected embedding shape"))?
        .iter()
        .map(as_vector)
        .collect::<Option<_>>()
        .ok_or_else(|| invalid("unexpected embedding shape"))?;

    let dim = tokens.first().map_or(0, Vec::len);
    if dim == 0 {
        return Err(invalid("empty embedding response"));
    }
    let mut pooled = vec![0.0f32; dim];
    for token in &tokens {
        for (acc, x) in pooled.iter_mut().zip(token) {
            *acc += x;
        }
    }
    let n = tokens.len() as f32;
    pooled.iter_mut().for_each(|x| *x /= n);
    Ok(pooled)
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddingProvider {
    async fn query_vector(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&FeatureExtractionRequest { inputs: [text] })
            .send()
            .await
            .map_err(classify_request_error)?;

        let value: serde_json::Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        first_embedding(value)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pooled_response() {
        let v = first_embedding(json!([[0.5, 1.0, -1.0]])).unwrap();
        assert_eq!(v, vec![0.5, 1.0, -1.0]);
    }

    #[test]
    fn test_token_level_response_is_mean_pooled() {
        let v = first_embedding(json!([[[1.0, 2.0], [3.0, 4.0]]])).unwrap();
        assert_eq!(v, vec![2.0, 3.0]);
    }

    #[test]
    fn test_bad_shapes() {
        assert!(first_embedding(json!([])).is_err());
        assert!(first_embedding(json!({"error": "loading"})).is_err());
    }
}
