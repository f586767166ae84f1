use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use super::{MessageRepository, VectorRepository};
use crate::error::RepositoryError;
use crate::models::{Message, Vector};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS vector (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    created_time TEXT NOT NULL,
    display_name TEXT NOT NULL,
    store TEXT NOT NULL,
    file TEXT NOT NULL,
    text TEXT NOT NULL,
    data TEXT NOT NULL,
    UNIQUE(owner, name)
);

CREATE INDEX IF NOT EXISTS idx_vector_store ON vector(owner, store);

CREATE TABLE IF NOT EXISTS message (
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    created_time TEXT NOT NULL,
    chat TEXT NOT NULL,
    reply_to TEXT NOT NULL,
    author TEXT NOT NULL,
    text TEXT NOT NULL,
    vector_scores TEXT NOT NULL,
    PRIMARY KEY (owner, name)
);
"#;

/// Vector and message records in a single SQLite file. Vector data and scores are
/// stored as JSON text.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn.lock().map_err(|_| RepositoryError::Poisoned)
    }
}

fn row_to_vector(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Vector, String)> {
    Ok((
        Vector {
            owner: row.get(0)?,
            name: row.get(1)?,
            created_time: row.get(2)?,
            display_name: row.get(3)?,
            store: row.get(4)?,
            file: row.get(5)?,
            text: row.get(6)?,
            data: Vec::new(),
        },
        row.get(7)?,
    ))
}

#[async_trait]
impl VectorRepository for SqliteRepository {
    async fn add_vector(&self, vector: &Vector) -> Result<(), RepositoryError> {
        let data = serde_json::to_string(&vector.data)?;
        self.conn()?.execute(
            "INSERT INTO vector (owner, name, created_time, display_name, store, file, text, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                vector.owner,
                vector.name,
                vector.created_time,
                vector.display_name,
                vector.store,
                vector.file,
                vector.text,
                data
            ],
        )?;
        Ok(())
    }

    async fn get_vectors(&self, owner: &str, store: &str) -> Result<Vec<Vector>, RepositoryError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT owner, name, created_time, display_name, store, file, text, data
             FROM vector WHERE owner = ?1 AND store = ?2 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![owner, store], row_to_vector)?;

        let mut vectors = Vec::new();
        for row in rows {
            let (mut vector, data) = row?;
            vector.data = serde_json::from_str(&data)?;
            vectors.push(vector);
        }
        Ok(vectors)
    }

    async fn delete_store_vectors(
        &self,
        owner: &str,
        store: &str,
    ) -> Result<usize, RepositoryError> {
        let deleted = self.conn()?.execute(
            "DELETE FROM vector WHERE owner = ?1 AND store = ?2",
            params![owner, store],
        )?;
        Ok(deleted)
    }

    async fn count_vectors(&self, owner: &str, store: &str) -> Result<usize, RepositoryError> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM vector WHERE owner = ?1 AND store = ?2",
            params![owner, store],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[async_trait]
impl MessageRepository for SqliteRepository {
    async fn add_message(&self, message: &Message) -> Result<(), RepositoryError> {
        let scores = serde_json::to_string(&message.vector_scores)?;
        self.conn()?.execute(
            "INSERT INTO message (owner, name, created_time, chat, reply_to, author, text, vector_scores)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.owner,
                message.name,
                message.created_time,
                message.chat,
                message.reply_to,
                message.author,
                message.text,
                scores
            ],
        )?;
        Ok(())
    }

    async fn get_message(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        let row = self
            .conn()?
            .query_row(
                "SELECT owner, name, created_time, chat, reply_to, author, text, vector_scores
                 FROM message WHERE owner = ?1 AND name = ?2",
                params![owner, name],
                |row| {
                    Ok((
                        Message {
                            owner: row.get(0)?,
                            name: row.get(1)?,
                            created_time: row.get(2)?,
                            chat: row.get(3)?,
                            reply_to: row.get(4)?,
                            author: row.get(5)?,
                            text: row.get(6)?,
                            vector_scores: Vec::new(),
                        },
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((mut message, scores)) => {
                message.vector_scores = serde_json::from_str(&scores)?;
                Ok(Some(message))
            }
            None => Ok(None),
        }
    }

    async fn update_message(&self, message: &Message) -> Result<bool, RepositoryError> {
        let scores = serde_json::to_string(&message.vector_scores)?;
        let updated = self.conn()?.execute(
            "UPDATE message SET chat = ?3, reply_to = ?4, author = ?5, text = ?6, vector_scores = ?7
             WHERE owner = ?1 AND name = ?2",
            params![
                message.owner,
                message.name,
                message.chat,
                message.reply_to,
                message.author,
                message.text,
                scores
            ],
        )?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VectorScore;

    #[tokio::test]
    async fn test_vector_round_trip_keeps_order() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        for i in 0..3 {
            let v = Vector::new("admin", "s", "a.txt", format!("chunk {i}"), vec![i as f32, 0.5]);
            repo.add_vector(&v).await.unwrap();
        }

        let vectors = repo.get_vectors("admin", "s").await.unwrap();
        let texts: Vec<_> = vectors.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec!["chunk 0", "chunk 1", "chunk 2"]);
        assert_eq!(vectors[2].data, vec![2.0, 0.5]);
        assert_eq!(repo.count_vectors("admin", "s").await.unwrap(), 3);

        assert_eq!(repo.delete_store_vectors("admin", "s").await.unwrap(), 3);
        assert!(repo.get_vectors("admin", "s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_message_update_last_writer_wins() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let msg = Message::new("admin", "m1", "c1", "AI", "");
        repo.add_message(&msg).await.unwrap();

        let mut first = msg.clone();
        first.text = "first".into();
        let mut second = msg.clone();
        second.text = "second".into();
        second.vector_scores = vec![VectorScore {
            vector: "vector_x".into(),
            score: 0.75,
        }];
        assert!(repo.update_message(&first).await.unwrap());
        assert!(repo.update_message(&second).await.unwrap());

        let stored = repo.get_message("admin", "m1").await.unwrap().unwrap();
        assert_eq!(stored.text, "second");
        assert_eq!(stored.vector_scores.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_message() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert!(repo.get_message("admin", "nope").await.unwrap().is_none());
    }
}
