use serde::{Deserialize, Serialize};

use super::provider::{ProviderConfig, StoreConfig};

pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 630;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub stores: Vec<StoreConfig>,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("ragchat").join("config.toml"))
    }

    pub fn data_dir() -> Option<std::path::PathBuf> {
        dirs::data_dir().map(|p| p.join("ragchat"))
    }

    pub fn load() -> Result<Self, crate::error::ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, crate::error::ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Path of the SQLite database holding vectors and messages.
    pub fn database_path(&self) -> Option<std::path::PathBuf> {
        self.database
            .path
            .clone()
            .or_else(|| Self::data_dir().map(|d| d.join("ragchat.db")))
    }

    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        use crate::error::ConfigError;

        if self.ingestion.max_chunk_length == 0 {
            return Err(ConfigError::ValidationError(
                "ingestion.max_chunk_length must be at least 1".to_string(),
            ));
        }
        if self.ingestion.calls_per_window == 0 || self.ingestion.window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "ingestion rate limit must allow at least one call per window".to_string(),
            ));
        }
        if self.ingestion.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "ingestion.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_http_timeout() -> u64 {
    120
}

fn default_user_agent() -> String {
    format!("ragchat/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            proxy: None,
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_max_chunk_length")]
    pub max_chunk_length: usize,

    #[serde(default = "default_calls_per_window")]
    pub calls_per_window: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_attempt_timeout_base")]
    pub attempt_timeout_base_secs: u64,

    #[serde(default = "default_attempt_timeout_step")]
    pub attempt_timeout_step_secs: u64,
}

fn default_max_chunk_length() -> usize {
    DEFAULT_MAX_CHUNK_LENGTH
}

fn default_calls_per_window() -> u32 {
    3
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    10
}

fn default_attempt_timeout_base() -> u64 {
    30
}

fn default_attempt_timeout_step() -> u64 {
    2
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: default_max_chunk_length(),
            calls_per_window: default_calls_per_window(),
            window_secs: default_window_secs(),
            max_attempts: default_max_attempts(),
            attempt_timeout_base_secs: default_attempt_timeout_base(),
            attempt_timeout_step_secs: default_attempt_timeout_step(),
        }
    }
}

impl IngestionConfig {
    pub fn retry_config(&self) -> crate::utils::RetryConfig {
        crate::utils::RetryConfig::embedding(
            self.max_attempts,
            std::time::Duration::from_secs(self.attempt_timeout_base_secs),
            std::time::Duration::from_secs(self.attempt_timeout_step_secs),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    1
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

/// Whether answers are emitted character by character at a typing pace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingPace {
    /// Use the backend's own default.
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default)]
    pub typing_pace: TypingPace,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            typing_pace: TypingPace::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_poll_max_attempts() -> u32 {
    20
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            poll_max_attempts: default_poll_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<std::path::PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.ingestion.max_chunk_length, 630);
        assert_eq!(config.ingestion.calls_per_window, 3);
        assert_eq!(config.ingestion.window_secs, 60);
        assert_eq!(config.ingestion.max_attempts, 10);
        assert_eq!(config.retrieval.top_k, 1);
        assert_eq!(config.jobs.poll_max_attempts, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [ingestion]
            max_chunk_length = 100

            [chat]
            typing_pace = "off"

            [[providers]]
            name = "openai"
            category = "Model"
            type = "OpenAI"
            sub_type = "gpt-3.5-turbo"
            client_secret = "$OPENAI_API_KEY"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ingestion.max_chunk_length, 100);
        assert_eq!(config.ingestion.calls_per_window, 3);
        assert_eq!(config.chat.typing_pace, TypingPace::Off);
        assert_eq!(config.chat.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].owner, "admin");
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let mut config = Config::default();
        config.ingestion.calls_per_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ingestion_retry_config() {
        let retry = IngestionConfig::default().retry_config();
        assert_eq!(retry.max_attempts, 10);
        let budget = retry.attempt_timeout.unwrap();
        assert_eq!(budget.for_attempt(1).as_secs(), 32);
    }
}
