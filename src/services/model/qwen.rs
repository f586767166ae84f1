use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{
    Accounting, Emission, EventSink, ModelMode, ModelProvider, QueryRequest, check_status,
    delta_stream, ensure_flushable, relay_stream,
};
use crate::error::ModelError;
use crate::models::{ModelResult, ProviderConfig, RawMessage};
use crate::services::pricing::{QWEN_PRICING, apply_price, price_entry, qwen_price};
use crate::services::prompt::{joined_knowledge, refined_question};
use crate::services::tokens::TokenCounter;

const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
const COUNTING_MODEL: &str = "gpt-4";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [RawMessage],
    stream: bool,
    temperature: f32,
    top_p: f32,
}

fn chat_delta(value: &serde_json::Value) -> Option<String> {
    value["choices"][0]["delta"]["content"]
        .as_str()
        .map(str::to_string)
}

/// Qwen models on DashScope's OpenAI-compatible endpoint. History and system
/// prompt are not forwarded: the knowledge is folded into the question.
pub struct QwenModelProvider {
    client: Client,
    base: String,
    secret: String,
    model: String,
    temperature: f32,
    top_p: f32,
    emission: Emission,
}

impl QwenModelProvider {
    pub fn new(client: Client, provider: &ProviderConfig) -> Self {
        Self {
            client,
            base: provider
                .provider_url
                .as_deref()
                .unwrap_or(DASHSCOPE_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            secret: provider.client_secret.clone(),
            model: provider.sub_type.clone(),
            temperature: provider.temperature,
            top_p: provider.top_p,
            emission: Emission::WholeFragment,
        }
    }

    #[must_use]
    pub fn with_emission(mut self, emission: Emission) -> Self {
        self.emission = emission;
        self
    }

    fn messages(request: &QueryRequest<'_>) -> Vec<RawMessage> {
        let question = refined_question(&joined_knowledge(request.knowledge), request.question);
        vec![RawMessage::user(question)]
    }
}

#[async_trait]
impl ModelProvider for QwenModelProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn mode(&self) -> ModelMode {
        ModelMode::Chat
    }

    fn pricing_summary(&self) -> &'static str {
        QWEN_PRICING
    }

    fn calculate_price(&self, result: &mut ModelResult) -> Result<(), ModelError> {
        let price = price_entry(qwen_price, &self.model)?;
        apply_price(&price, result);
        Ok(())
    }

    async fn query_text(
        &self,
        request: &QueryRequest<'_>,
        sink: &mut dyn EventSink,
    ) -> Result<ModelResult, ModelError> {
        ensure_flushable(sink)?;
        let price = price_entry(qwen_price, &self.model)?;
        let counter = TokenCounter::for_model(COUNTING_MODEL)?;
        let messages = Self::messages(request);
        let prompt_tokens = counter.count_messages(&messages);
        debug!(model = %self.model, prompt_tokens, "qwen request");

        let body = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: true,
            temperature: self.temperature,
            top_p: self.top_p,
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base))
            .bearer_auth(&self.secret)
            .json(&body)
            .send()
            .await
            .map_err(ModelError::RequestError)?;
        let response = check_status(response).await?;

        let mut accounting = Accounting::new(counter, price, prompt_tokens);
        let mut emission = self.emission.strategy();
        relay_stream(
            delta_stream(response.bytes_stream(), chat_delta),
            &mut accounting,
            emission.as_mut(),
            sink,
        )
        .await?;
        Ok(accounting.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderCategory, Role};

    fn backend(model: &str) -> QwenModelProvider {
        let provider =
            ProviderConfig::new("qwen", ProviderCategory::Model, "Qwen", model).with_secret("sk");
        QwenModelProvider::new(Client::new(), &provider)
    }

    #[test]
    fn test_question_only_message_list() {
        let history = vec![RawMessage::user("earlier"), RawMessage::assistant("reply")];
        let knowledge = vec![RawMessage::system("Paris is the capital of France.")];
        let request = QueryRequest {
            question: "What is the capital of France?",
            history: &history,
            system_prompt: "be brief",
            knowledge: &knowledge,
        };
        let messages = QwenModelProvider::messages(&request);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].content.contains("Paris is the capital of France."));
        assert!(messages[0].content.contains("What is the capital of France?"));
        assert!(!messages[0].content.contains("earlier"));
    }

    #[test]
    fn test_total_basis_pricing_in_cny() {
        let mut result = ModelResult::with_prompt_tokens(1000);
        result.add_response_tokens(1000);
        backend("qwen-turbo").calculate_price(&mut result).unwrap();
        // 2000 tokens at 0.002 plus 2000 tokens at 0.006
        assert!((result.total_price - 0.016).abs() < 1e-9);
        assert_eq!(result.currency, "CNY");
    }

    #[test]
    fn test_unknown_qwen_model() {
        let mut result = ModelResult::default();
        let err = backend("qwen-ultra").calculate_price(&mut result).unwrap_err();
        assert!(matches!(err, ModelError::UnknownModel(m) if m == "qwen-ultra"));
    }
}
