mod config;
mod message;
mod provider;
mod vector;

pub use config::{
    ChatConfig, Config, DEFAULT_MAX_CHUNK_LENGTH, DEFAULT_SYSTEM_PROMPT, DatabaseConfig,
    HttpConfig, IngestionConfig, JobsConfig, RetrievalConfig, TypingPace,
};
pub use message::{Message, ModelResult, RawMessage, Role};
pub use provider::{
    DEFAULT_OWNER, DEFAULT_STORE_NAME, DUMMY_PROVIDER_TYPE, ProviderCategory, ProviderConfig,
    StoreConfig, split_id,
};
pub use vector::{Vector, VectorScore};
