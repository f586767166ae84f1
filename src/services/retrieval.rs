//! Question → most relevant stored passages.

use std::sync::Arc;

use tracing::debug;

use crate::error::SearchError;
use crate::models::{Vector, VectorScore};
use crate::repository::VectorRepository;
use crate::services::embedding::EmbeddingProvider;
use crate::services::ingest::embed_with_retry;
use crate::services::similarity::top_k;
use crate::utils::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    pub vector: Vector,
    pub score: f32,
}

impl RetrievedPassage {
    pub fn score_record(&self) -> VectorScore {
        VectorScore {
            vector: self.vector.name.clone(),
            score: self.score,
        }
    }
}

pub struct Retriever {
    vectors: Arc<dyn VectorRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    retry: RetryConfig,
}

impl Retriever {
    pub fn new(
        vectors: Arc<dyn VectorRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            vectors,
            embedder,
            retry,
        }
    }

    /// Rank every vector of the store against the question. Each call rescans
    /// the whole store.
    pub async fn retrieve(
        &self,
        owner: &str,
        store: &str,
        question: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, SearchError> {
        let candidates = self.vectors.get_vectors(owner, store).await?;
        if candidates.is_empty() {
            return Err(SearchError::NoVectors(format!("{owner}/{store}")));
        }

        let query = embed_with_retry(self.embedder.as_ref(), &self.retry, question).await?;
        if query.iter().all(|x| *x == 0.0) {
            return Err(SearchError::ZeroQuery);
        }
        if let Some(bad) = candidates.iter().find(|v| v.dimension() != query.len()) {
            return Err(SearchError::DimensionMismatch {
                name: bad.name.clone(),
                query: query.len(),
                candidate: bad.dimension(),
            });
        }

        let ranked = top_k(&query, candidates.iter().map(|v| v.data.as_slice()), limit);
        debug!(store, candidates = candidates.len(), hits = ranked.len(), "retrieval done");

        let mut candidates: Vec<Option<Vector>> = candidates.into_iter().map(Some).collect();
        Ok(ranked
            .into_iter()
            .filter_map(|(index, score)| {
                candidates[index]
                    .take()
                    .map(|vector| RetrievedPassage { vector, score })
            })
            .collect())
    }
}
