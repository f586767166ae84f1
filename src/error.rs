//! Error types for the retrieval-augmented chat core.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding provider: {0}")]
    ConnectionError(String),

    #[error("embedding provider error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection and timeout errors are retryable
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // Server errors might be transient (e.g., 503 Service Unavailable)
            EmbeddingError::ServerError(msg) => is_transient_status_message(msg),
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

impl From<tokio::time::error::Elapsed> for EmbeddingError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        EmbeddingError::Timeout
    }
}

fn is_transient_status_message(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("504")
        || msg.contains("429")
        || lower.contains("unavailable")
        || lower.contains("too many requests")
        || lower.contains("loading")
}

/// Errors raised while generating an answer.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("model provider error: {0}")]
    ServerError(String),

    #[error("model stream error: {0}")]
    Stream(String),

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("unknown model type: {0}")]
    UnknownModel(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("destination does not support incremental flushing")]
    FlushUnsupported,

    #[error("failed to write to destination: {0}")]
    Sink(#[from] std::io::Error),
}

impl Retryable for ModelError {
    fn is_retryable(&self) -> bool {
        match self {
            ModelError::RequestError(e) => e.is_timeout() || e.is_connect(),
            ModelError::ServerError(msg) => is_transient_status_message(msg),
            _ => false,
        }
    }
}

/// Errors related to configuration and provider resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("the {category} provider: {name} is not found")]
    ProviderNotFound { category: String, name: String },

    #[error("please add {article} {category} provider first")]
    NoDefaultProvider {
        article: &'static str,
        category: String,
    },

    #[error("the provider: {id} is expected to be \"{expected}\" category, got: \"{actual}\"")]
    CategoryMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("the provider: {0}'s client secret should not be empty")]
    MissingSecret(String),

    #[error("unsupported {category} provider type: {provider_type}")]
    UnsupportedProviderType {
        category: String,
        provider_type: String,
    },

    #[error("store not found: {0}")]
    StoreNotFound(String),

    #[error("failed to look up configuration: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors related to the object storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to list objects: {0}")]
    ListError(String),

    #[error("HTTP request failed with status code: {0}")]
    HttpStatus(u16),

    #[error("storage request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("failed to read object {key}: {message}")]
    ReadError { key: String, message: String },

    #[error("failed to extract text from {key}: {message}")]
    ExtractError { key: String, message: String },
}

/// Errors related to the persistence collaborator.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("database lock poisoned")]
    Poisoned,
}

/// Errors raised by the ingestion pipeline. Any of them aborts the batch.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("ingestion cancelled")]
    Cancelled,
}

impl Retryable for IngestError {
    fn is_retryable(&self) -> bool {
        match self {
            IngestError::Embedding(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<tokio::time::error::Elapsed> for IngestError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        IngestError::Embedding(EmbeddingError::Timeout)
    }
}

/// Errors related to vector retrieval.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no knowledge vectors found for store: {0}")]
    NoVectors(String),

    #[error("vector dimension mismatch: query has {query}, candidate {name} has {candidate}")]
    DimensionMismatch {
        name: String,
        query: usize,
        candidate: usize,
    },

    #[error("query embedding has zero norm")]
    ZeroQuery,

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors raised while answering a question end to end.
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("answer error: {0}")]
    Answer(#[from] AnswerError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    Other(String),
}
