//! Storage → chunks → embeddings → vector records.

use std::io::Cursor;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{EmbeddingError, IngestError, StorageError};
use crate::models::{IngestionConfig, Vector};
use crate::repository::VectorRepository;
use crate::services::chunker::LineChunker;
use crate::services::embedding::EmbeddingProvider;
use crate::services::rate_limit::EmbeddingRateLimiter;
use crate::storage::{ObjectStorage, StorageObject, extract_text, filter_text_objects};
use crate::utils::{
    CancelToken, RetryConfig, has_meaningful_content, with_gated_retry, with_retry,
};

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    pub vectors: usize,
}

/// One embedding call under the configured attempt budget.
pub async fn embed_with_retry(
    embedder: &dyn EmbeddingProvider,
    retry: &RetryConfig,
    text: &str,
) -> Result<Vec<f32>, EmbeddingError> {
    with_retry(retry, || embedder.query_vector(text))
        .await
        .into_result()
}

pub struct IngestPipeline {
    storage: Arc<dyn ObjectStorage>,
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorRepository>,
    limiter: Arc<EmbeddingRateLimiter>,
    retry: RetryConfig,
    max_chunk_length: usize,
}

impl IngestPipeline {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorRepository>,
        limiter: Arc<EmbeddingRateLimiter>,
        config: &IngestionConfig,
    ) -> Self {
        Self {
            storage,
            embedder,
            vectors,
            limiter,
            retry: config.retry_config(),
            max_chunk_length: config.max_chunk_length,
        }
    }

    /// Embed every eligible document under `prefix` into `store`.
    ///
    /// Chunks of one file are embedded and persisted in order. The first
    /// unrecovered error stops the run; vectors written before it stay.
    pub async fn ingest(
        &self,
        owner: &str,
        store: &str,
        prefix: &str,
        cancel: &CancelToken,
    ) -> Result<IngestReport, IngestError> {
        let objects = filter_text_objects(self.storage.list_objects(prefix).await?);
        let mut report = IngestReport::default();

        if objects.is_empty() {
            info!(store, prefix, "no text documents to ingest");
            return Ok(report);
        }

        for object in &objects {
            let written = self.ingest_object(owner, store, object, cancel).await?;
            report.files += 1;
            report.chunks += written;
            report.vectors += written;
            info!(store, file = %object.key, chunks = written, "document ingested");
        }

        Ok(report)
    }

    /// Delete the store's vectors, then ingest again. There is no rollback: a
    /// failure part-way leaves the store with whatever was written so far.
    pub async fn refresh(
        &self,
        owner: &str,
        store: &str,
        prefix: &str,
        cancel: &CancelToken,
    ) -> Result<IngestReport, IngestError> {
        let deleted = self.vectors.delete_store_vectors(owner, store).await?;
        info!(store, deleted, "store vectors cleared");
        self.ingest(owner, store, prefix, cancel).await
    }

    async fn ingest_object(
        &self,
        owner: &str,
        store: &str,
        object: &StorageObject,
        cancel: &CancelToken,
    ) -> Result<usize, IngestError> {
        let bytes = self.storage.read_object(object).await?;
        let text = extract_text(&object.key, &bytes)?;
        let mut written = 0;

        for (index, chunk) in LineChunker::new(Cursor::new(text), self.max_chunk_length).enumerate()
        {
            let chunk = chunk.map_err(|e| StorageError::ReadError {
                key: object.key.clone(),
                message: e.to_string(),
            })?;
            if !has_meaningful_content(&chunk) {
                continue;
            }

            debug!(file = %object.key, chunk = index, "embedding chunk");
            let data = self.embed_chunk(&chunk, cancel).await?;

            let vector = Vector::new(owner, store, &object.key, chunk, data);
            self.vectors.add_vector(&vector).await?;
            written += 1;
        }

        Ok(written)
    }

    /// Every attempt, retries included, takes its own rate-limit slot.
    async fn embed_chunk(&self, text: &str, cancel: &CancelToken) -> Result<Vec<f32>, IngestError> {
        let limiter = self.limiter.as_ref();
        let embedder = self.embedder.as_ref();
        with_gated_retry(
            &self.retry,
            || limiter.acquire(cancel),
            || async move { embedder.query_vector(text).await.map_err(IngestError::from) },
        )
        .await
        .into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct Flaky {
        failures: u32,
        error: fn() -> EmbeddingError,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingProvider for Flaky {
        async fn query_vector(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err((self.error)())
            } else {
                Ok(vec![1.0, 0.0])
            }
        }

        fn model(&self) -> &str {
            "flaky"
        }
    }

    fn retry() -> RetryConfig {
        RetryConfig::embedding(10, Duration::from_secs(30), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let flaky = Flaky {
            failures: 2,
            error: || EmbeddingError::Timeout,
            calls: AtomicU32::new(0),
        };
        let data = embed_with_retry(&flaky, &retry(), "text").await.unwrap();
        assert_eq!(data, vec![1.0, 0.0]);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempt_budget_is_bounded() {
        let flaky = Flaky {
            failures: u32::MAX,
            error: || EmbeddingError::ConnectionError("refused".to_string()),
            calls: AtomicU32::new(0),
        };
        let err = embed_with_retry(&flaky, &retry(), "text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ConnectionError(_)));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_credential_errors_fail_fast() {
        let flaky = Flaky {
            failures: u32::MAX,
            error: || EmbeddingError::ServerError("status 401: bad key".to_string()),
            calls: AtomicU32::new(0),
        };
        assert!(embed_with_retry(&flaky, &retry(), "text").await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}
