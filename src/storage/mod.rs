//! Object storage collaborator: listing and fetching source documents.

mod extract;
mod http;
mod local;

pub use extract::extract_text;
pub use http::HttpObjectStorage;
pub use local::LocalObjectStorage;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StorageError};
use crate::models::StoreConfig;

/// One listed object: its storage key and where to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageObject {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StorageObject>, StorageError>;

    async fn read_object(&self, object: &StorageObject) -> Result<Vec<u8>, StorageError>;
}

/// Extensions whose content is turned into text and embedded.
const TEXT_EXTENSIONS: &[(&str, bool)] = &[
    ("txt", true),
    ("md", true),
    ("docx", true),
    ("doc", false),
    ("pdf", true),
];

/// Whether a key names a text-bearing document. Matching is on the exact
/// extension; `.doc` is listed but not accepted.
pub fn is_text_key(key: &str) -> bool {
    let Some(ext) = Path::new(key).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    TEXT_EXTENSIONS
        .iter()
        .any(|(allowed, enabled)| *enabled && *allowed == ext)
}

pub fn filter_text_objects(objects: Vec<StorageObject>) -> Vec<StorageObject> {
    objects.into_iter().filter(|o| is_text_key(&o.key)).collect()
}

/// Build the storage backend a store points at.
pub fn storage_for_store(
    store: &StoreConfig,
    client: reqwest::Client,
) -> Result<Box<dyn ObjectStorage>, ConfigError> {
    if let Some(root) = &store.storage_root {
        return Ok(Box::new(LocalObjectStorage::new(root.clone())));
    }
    if let Some(url) = &store.storage_url {
        return Ok(Box::new(HttpObjectStorage::new(client, url)));
    }
    Err(ConfigError::ValidationError(format!(
        "store {} has neither storage_root nor storage_url",
        store.id()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(key: &str) -> StorageObject {
        StorageObject {
            key: key.to_string(),
            url: format!("https://files.example.com/{key}"),
        }
    }

    #[test]
    fn test_allow_list() {
        assert!(is_text_key("notes/a.txt"));
        assert!(is_text_key("README.md"));
        assert!(is_text_key("report.docx"));
        assert!(is_text_key("paper.pdf"));
        assert!(!is_text_key("legacy.doc"));
        assert!(!is_text_key("image.png"));
        assert!(!is_text_key("Makefile"));
    }

    #[test]
    fn test_filter_keeps_order() {
        let objects = vec![obj("b.md"), obj("x.doc"), obj("a.txt"), obj("c.jpg")];
        let keys: Vec<_> = filter_text_objects(objects)
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(keys, vec!["b.md", "a.txt"]);
    }

    #[test]
    fn test_store_without_storage_is_rejected() {
        let store = StoreConfig::new("empty");
        assert!(storage_for_store(&store, reqwest::Client::new()).is_err());
    }
}
