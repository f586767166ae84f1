//! Conversation turns, stored messages and per-turn usage.

use serde::{Deserialize, Serialize};

use super::vector::VectorScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of conversation or retrieved context fed to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub role: Role,
    pub content: String,
}

impl RawMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A stored chat message. The reply to a question is patched in place once the
/// answer is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub owner: String,
    pub name: String,
    pub created_time: String,
    pub chat: String,
    pub reply_to: String,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub vector_scores: Vec<VectorScore>,
}

impl Message {
    pub fn new(owner: &str, name: &str, chat: &str, author: &str, text: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            created_time: chrono::Utc::now().to_rfc3339(),
            chat: chat.to_string(),
            reply_to: String::new(),
            author: author.to_string(),
            text: text.to_string(),
            vector_scores: Vec::new(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Usage and cost of one generated answer, updated as the stream progresses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub prompt_token_count: u64,
    pub response_token_count: u64,
    pub total_token_count: u64,
    pub total_price: f64,
    pub currency: String,
    #[serde(default)]
    pub image_count: u32,
}

impl ModelResult {
    pub fn with_prompt_tokens(prompt_token_count: u64) -> Self {
        Self {
            prompt_token_count,
            total_token_count: prompt_token_count,
            ..Default::default()
        }
    }

    /// Add tokens of one emitted fragment. The total is derived, never tracked
    /// separately.
    pub fn add_response_tokens(&mut self, tokens: u64) {
        self.response_token_count += tokens;
        self.total_token_count = self.prompt_token_count + self.response_token_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_result_totals() {
        let mut result = ModelResult::with_prompt_tokens(10);
        assert_eq!(result.total_token_count, 10);
        result.add_response_tokens(3);
        result.add_response_tokens(2);
        assert_eq!(result.response_token_count, 5);
        assert_eq!(result.total_token_count, 15);
    }

    #[test]
    fn test_role_serialization() {
        let msg = RawMessage::system("be brief");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be brief"}"#);
    }
}
