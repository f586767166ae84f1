use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MessageRepository, VectorRepository};
use crate::error::RepositoryError;
use crate::models::{Message, Vector};

/// In-process vector and message records, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    vectors: RwLock<Vec<Vector>>,
    messages: RwLock<HashMap<String, Message>>,
    vector_writes: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `add_vector` calls seen so far.
    pub fn vector_writes(&self) -> usize {
        self.vector_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorRepository for MemoryRepository {
    async fn add_vector(&self, vector: &Vector) -> Result<(), RepositoryError> {
        self.vectors.write().await.push(vector.clone());
        self.vector_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_vectors(&self, owner: &str, store: &str) -> Result<Vec<Vector>, RepositoryError> {
        Ok(self
            .vectors
            .read()
            .await
            .iter()
            .filter(|v| v.owner == owner && v.store == store)
            .cloned()
            .collect())
    }

    async fn delete_store_vectors(
        &self,
        owner: &str,
        store: &str,
    ) -> Result<usize, RepositoryError> {
        let mut vectors = self.vectors.write().await;
        let before = vectors.len();
        vectors.retain(|v| !(v.owner == owner && v.store == store));
        Ok(before - vectors.len())
    }

    async fn count_vectors(&self, owner: &str, store: &str) -> Result<usize, RepositoryError> {
        Ok(self
            .vectors
            .read()
            .await
            .iter()
            .filter(|v| v.owner == owner && v.store == store)
            .count())
    }
}

#[async_trait]
impl MessageRepository for MemoryRepository {
    async fn add_message(&self, message: &Message) -> Result<(), RepositoryError> {
        self.messages
            .write()
            .await
            .insert(message.id(), message.clone());
        Ok(())
    }

    async fn get_message(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .messages
            .read()
            .await
            .get(&format!("{owner}/{name}"))
            .cloned())
    }

    async fn update_message(&self, message: &Message) -> Result<bool, RepositoryError> {
        let mut messages = self.messages.write().await;
        match messages.get_mut(&message.id()) {
            Some(existing) => {
                *existing = message.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_vectors_scoped_by_store() {
        let repo = MemoryRepository::new();
        repo.add_vector(&Vector::new("admin", "a", "f.txt", "one".into(), vec![1.0]))
            .await
            .unwrap();
        repo.add_vector(&Vector::new("admin", "b", "f.txt", "two".into(), vec![1.0]))
            .await
            .unwrap();

        assert_eq!(repo.count_vectors("admin", "a").await.unwrap(), 1);
        assert_eq!(repo.delete_store_vectors("admin", "a").await.unwrap(), 1);
        assert_eq!(repo.count_vectors("admin", "a").await.unwrap(), 0);
        assert_eq!(repo.count_vectors("admin", "b").await.unwrap(), 1);
        assert_eq!(repo.vector_writes(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_message() {
        let repo = MemoryRepository::new();
        let msg = Message::new("admin", "m1", "chat", "AI", "");
        assert!(!repo.update_message(&msg).await.unwrap());
        repo.add_message(&msg).await.unwrap();

        let mut patched = msg.clone();
        patched.text = "answer".into();
        assert!(repo.update_message(&patched).await.unwrap());
        let stored = repo.get_message("admin", "m1").await.unwrap().unwrap();
        assert_eq!(stored.text, "answer");
    }
}
