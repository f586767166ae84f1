use serde::{Deserialize, Serialize};

use crate::utils::display_name;

/// A stored embedding of one chunk of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub owner: String,
    pub name: String,
    pub created_time: String,
    pub display_name: String,
    pub store: String,
    pub file: String,
    pub text: String,
    pub data: Vec<f32>,
}

impl Vector {
    pub fn generate_name() -> String {
        format!("vector_{}", uuid::Uuid::new_v4().simple())
    }

    pub fn new(owner: &str, store: &str, file: &str, text: String, data: Vec<f32>) -> Self {
        Self {
            owner: owner.to_string(),
            name: Self::generate_name(),
            created_time: chrono::Utc::now().to_rfc3339(),
            display_name: display_name(&text),
            store: store.to_string(),
            file: file.to_string(),
            text,
            data,
        }
    }

    pub fn id(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn dimension(&self) -> usize {
        self.data.len()
    }
}

/// Similarity of one stored vector to a question, attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorScore {
    pub vector: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_new() {
        let text = "The quick brown fox jumps over the lazy dog".to_string();
        let v = Vector::new("admin", "store-a", "docs/a.txt", text, vec![0.1, 0.2]);
        assert!(v.name.starts_with("vector_"));
        assert_eq!(v.display_name, "The quick brown fox jumps");
        assert_eq!(v.dimension(), 2);
        assert_eq!(v.id(), format!("admin/{}", v.name));
    }

    #[test]
    fn test_generated_names_are_unique() {
        assert_ne!(Vector::generate_name(), Vector::generate_name());
    }
}
