use std::path::PathBuf;

use async_trait::async_trait;
use walkdir::WalkDir;

use super::{ObjectStorage, StorageObject};
use crate::error::StorageError;

/// Documents kept in a local directory tree. Keys are `/`-separated paths
/// relative to the root.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
}

impl LocalObjectStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StorageObject>, StorageError> {
        let mut objects = Vec::new();

        for entry in WalkDir::new(&self.root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| StorageError::ListError(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if key.starts_with(prefix) {
                objects.push(StorageObject {
                    key,
                    url: entry.path().to_string_lossy().to_string(),
                });
            }
        }

        Ok(objects)
    }

    async fn read_object(&self, object: &StorageObject) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(&object.url)
            .await
            .map_err(|e| StorageError::ReadError {
                key: object.key.clone(),
                message: e.to_string(),
            })
    }
}
