pub mod answer;
pub mod chunker;
pub mod embedding;
pub mod ingest;
pub mod jobs;
pub mod model;
pub mod pricing;
pub mod prompt;
pub mod provider;
pub mod rate_limit;
pub mod retrieval;
pub mod similarity;
pub mod tokens;

pub use answer::{Answer, AnswerRequest, AnswerService, AnswerSettings, resolve_store};
pub use chunker::{LineChunker, split_text};
pub use embedding::{EmbeddingProvider, create_embedding_provider, resolve_embedding_provider};
pub use ingest::{IngestPipeline, IngestReport, embed_with_retry};
pub use jobs::{PollJob, PollOutcome, PollSettings, spawn_image_job, spawn_poll_job};
pub use model::{
    EventSink, ModelMode, ModelProvider, QueryRequest, create_model_provider,
    resolve_model_provider,
};
pub use provider::lookup_provider;
pub use rate_limit::EmbeddingRateLimiter;
pub use retrieval::{RetrievedPassage, Retriever};
pub use similarity::{cosine_similarity, nearest_neighbor, top_k};
pub use tokens::TokenCounter;
