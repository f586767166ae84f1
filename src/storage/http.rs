use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::{ObjectStorage, StorageObject};
use crate::error::StorageError;

/// Remote storage exposing a JSON listing endpoint. `GET {listing_url}?prefix=...`
/// returns `[{"key": ..., "url": ...}]`.
#[derive(Debug, Clone)]
pub struct HttpObjectStorage {
    client: Client,
    listing_url: String,
}

impl HttpObjectStorage {
    pub fn new(client: Client, listing_url: &str) -> Self {
        Self {
            client,
            listing_url: listing_url.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StorageObject>, StorageError> {
        let response = self
            .client
            .get(&self.listing_url)
            .query(&[("prefix", prefix)])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(StorageError::HttpStatus(response.status().as_u16()));
        }

        response
            .json::<Vec<StorageObject>>()
            .await
            .map_err(|e| StorageError::ListError(e.to_string()))
    }

    async fn read_object(&self, object: &StorageObject) -> Result<Vec<u8>, StorageError> {
        let response = self.client.get(&object.url).send().await?;

        // Only a plain 200 counts; redirects are followed by the client.
        if response.status() != StatusCode::OK {
            return Err(StorageError::HttpStatus(response.status().as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
