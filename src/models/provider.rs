//! Provider and store configuration entities.

use serde::{Deserialize, Serialize};

/// Owner used when a record does not name one.
pub const DEFAULT_OWNER: &str = "admin";

/// Well-known store name that resolves to the owner's default store.
pub const DEFAULT_STORE_NAME: &str = "_default_store_";

/// Provider type that may be used without a client secret.
pub const DUMMY_PROVIDER_TYPE: &str = "Dummy";

/// Category a provider must belong to for the capability it is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderCategory {
    Model,
    Embedding,
}

impl ProviderCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderCategory::Model => "Model",
            ProviderCategory::Embedding => "Embedding",
        }
    }

    /// Lowercase noun used in user-facing messages.
    pub fn noun(&self) -> &'static str {
        match self {
            ProviderCategory::Model => "model",
            ProviderCategory::Embedding => "embedding",
        }
    }

    pub fn article(&self) -> &'static str {
        match self {
            ProviderCategory::Model => "a",
            ProviderCategory::Embedding => "an",
        }
    }
}

impl std::fmt::Display for ProviderCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External provider record. Category and type are kept as free-form strings:
/// they are validated when the provider is resolved, not when it is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_owner")]
    pub owner: String,

    pub name: String,

    #[serde(default)]
    pub display_name: String,

    pub category: String,

    #[serde(rename = "type")]
    pub provider_type: String,

    /// Model or deployment identifier within the backend.
    #[serde(default)]
    pub sub_type: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default)]
    pub frequency_penalty: f32,

    #[serde(default)]
    pub presence_penalty: f32,

    #[serde(default)]
    pub is_default: bool,
}

fn default_owner() -> String {
    DEFAULT_OWNER.to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    1.0
}

impl ProviderConfig {
    pub fn new(name: &str, category: ProviderCategory, provider_type: &str, sub_type: &str) -> Self {
        Self {
            owner: default_owner(),
            name: name.to_string(),
            display_name: name.to_string(),
            category: category.as_str().to_string(),
            provider_type: provider_type.to_string(),
            sub_type: sub_type.to_string(),
            client_secret: String::new(),
            provider_url: None,
            deployment_name: None,
            api_version: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            is_default: false,
        }
    }

    #[must_use]
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.client_secret = secret.to_string();
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: &str) -> Self {
        self.provider_url = Some(url.to_string());
        self
    }

    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn id(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A named collection of vectors built from one storage prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_owner")]
    pub owner: String,

    pub name: String,

    #[serde(default)]
    pub display_name: String,

    /// Local directory holding the store's documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_root: Option<std::path::PathBuf>,

    /// Listing endpoint returning `[{key, url}]` for remote documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,

    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub model_provider: String,

    #[serde(default)]
    pub embedding_provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub is_default: bool,
}

impl StoreConfig {
    pub fn new(name: &str) -> Self {
        Self {
            owner: default_owner(),
            name: name.to_string(),
            display_name: name.to_string(),
            storage_root: None,
            storage_url: None,
            prefix: String::new(),
            model_provider: String::new(),
            embedding_provider: String::new(),
            system_prompt: None,
            is_default: false,
        }
    }

    pub fn id(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Split an `owner/name` id. A bare name gets the default owner.
pub fn split_id(id: &str) -> (&str, &str) {
    match id.split_once('/') {
        Some((owner, name)) => (owner, name),
        None => (DEFAULT_OWNER, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_id() {
        assert_eq!(split_id("admin/store-a"), ("admin", "store-a"));
        assert_eq!(split_id("store-a"), ("admin", "store-a"));
    }

    #[test]
    fn test_provider_id() {
        let p = ProviderConfig::new("openai", ProviderCategory::Model, "OpenAI", "gpt-4");
        assert_eq!(p.id(), "admin/openai");
        assert_eq!(p.category, "Model");
    }

    #[test]
    fn test_category_wording() {
        assert_eq!(ProviderCategory::Embedding.article(), "an");
        assert_eq!(ProviderCategory::Model.noun(), "model");
    }
}
