use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use crate::models::ProviderConfig;

const DEFAULT_DIMENSION: usize = 64;

/// Credential-free hashed bag-of-words embedding. Texts sharing words get
/// similar vectors, so retrieval behaves sensibly without a network.
#[derive(Debug, Clone)]
pub struct DummyEmbeddingProvider {
    dimension: usize,
    model: String,
}

impl DummyEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            model: "dummy".to_string(),
        }
    }

    /// `sub_type` may carry the dimension, e.g. `"128"`.
    pub fn from_config(provider: &ProviderConfig) -> Self {
        Self::new(provider.sub_type.parse().unwrap_or(DEFAULT_DIMENSION))
    }

    fn bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for DummyEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for DummyEmbeddingProvider {
    async fn query_vector(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        let mut tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .peekable();

        if tokens.peek().is_none() {
            let (index, sign) = self.bucket(text);
            vector[index] = sign;
            return Ok(vector);
        }

        for token in tokens {
            let (index, sign) = self.bucket(token);
            vector[index] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic_and_fixed_dimension() {
        let provider = DummyEmbeddingProvider::new(32);
        let a = provider.query_vector("Rust ownership rules").await.unwrap();
        let b = provider.query_vector("Rust ownership rules").await.unwrap();
        let c = provider.query_vector("").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_eq!(c.len(), 32);
    }

    #[tokio::test]
    async fn test_dimension_from_sub_type() {
        let config = ProviderConfig::new(
            "d",
            crate::models::ProviderCategory::Embedding,
            "Dummy",
            "16",
        );
        let provider = DummyEmbeddingProvider::from_config(&config);
        assert_eq!(provider.query_vector("x").await.unwrap().len(), 16);
    }
}
