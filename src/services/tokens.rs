//! Model-aware token counting on top of tiktoken encodings.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;
use tiktoken_rs::tokenizer::{Tokenizer, get_tokenizer};

use crate::error::ModelError;
use crate::models::RawMessage;

type Cached = OnceLock<Result<CoreBPE, String>>;

static O200K: Cached = OnceLock::new();
static CL100K: Cached = OnceLock::new();
static P50K: Cached = OnceLock::new();
static R50K: Cached = OnceLock::new();

fn load(
    cell: &'static Cached,
    build: fn() -> anyhow::Result<CoreBPE>,
) -> Result<&'static CoreBPE, ModelError> {
    cell.get_or_init(|| build().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| ModelError::Tokenizer(e.clone()))
}

/// Token counter bound to the encoding a model family uses.
#[derive(Clone, Copy)]
pub struct TokenCounter {
    bpe: &'static CoreBPE,
    tokens_per_message: i64,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("tokens_per_message", &self.tokens_per_message)
            .finish_non_exhaustive()
    }
}

impl TokenCounter {
    /// Counter for `model`. Models with no known encoding are an error.
    pub fn for_model(model: &str) -> Result<Self, ModelError> {
        let tokenizer = get_tokenizer(model)
            .ok_or_else(|| ModelError::Tokenizer(format!("no encoding for model: {model}")))?;
        let bpe = match tokenizer {
            Tokenizer::O200kBase => load(&O200K, tiktoken_rs::o200k_base)?,
            Tokenizer::Cl100kBase => load(&CL100K, tiktoken_rs::cl100k_base)?,
            Tokenizer::P50kBase | Tokenizer::P50kEdit => load(&P50K, tiktoken_rs::p50k_base)?,
            Tokenizer::R50kBase | Tokenizer::Gpt2 => load(&R50K, tiktoken_rs::r50k_base)?,
        };
        let tokens_per_message = if model == "gpt-3.5-turbo-0301" { 4 } else { 3 };
        Ok(Self {
            bpe,
            tokens_per_message,
        })
    }

    pub fn count(&self, text: &str) -> u64 {
        self.bpe.encode_with_special_tokens(text).len() as u64
    }

    /// Prompt size of a chat request: per-message framing, role and content,
    /// plus the tokens priming the reply.
    pub fn count_messages(&self, messages: &[RawMessage]) -> u64 {
        let body: i64 = messages
            .iter()
            .map(|m| {
                self.tokens_per_message
                    + self.count(m.role.as_str()) as i64
                    + self.count(&m.content) as i64
            })
            .sum();
        (body + 3).max(0) as u64
    }
}

/// Context window of an OpenAI-family model, in tokens.
pub fn context_window(model: &str) -> u64 {
    match model {
        m if m.contains("gpt-4o") => 128_000,
        m if m.contains("gpt-4-turbo") || m.contains("gpt-4-vision") => 128_000,
        m if m.contains("gpt-4-1106") || m.contains("gpt-4-0125") => 128_000,
        m if m.contains("gpt-4-32k") => 32_768,
        m if m.contains("gpt-4") => 8_192,
        m if m.contains("gpt-3.5-turbo-instruct") => 4_096,
        m if m.contains("gpt-3.5-turbo-16k") => 16_385,
        m if m.contains("gpt-3.5-turbo-1106") || m.contains("gpt-3.5-turbo-0125") => 16_385,
        m if m.contains("gpt-3.5-turbo") => 4_096,
        _ => 4_097,
    }
}
