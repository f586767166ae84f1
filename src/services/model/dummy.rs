use async_trait::async_trait;

use super::{
    Accounting, Emission, EventSink, ModelMode, ModelProvider, QueryRequest, ensure_flushable,
};
use crate::error::ModelError;
use crate::models::ModelResult;
use crate::services::pricing::{DUMMY_PRICING, PriceEntry, apply_price};
use crate::services::tokens::TokenCounter;

const COUNTING_MODEL: &str = "gpt-4";
const DEFAULT_MODEL: &str = "dummy";

/// Offline backend: answers with the best retrieved passage, or echoes the
/// question when nothing was retrieved. Streamed word by word, priced at zero.
#[derive(Debug, Clone)]
pub struct DummyModelProvider {
    model: String,
    emission: Emission,
}

impl DummyModelProvider {
    pub fn new(sub_type: &str) -> Self {
        let model = if sub_type.is_empty() {
            DEFAULT_MODEL
        } else {
            sub_type
        };
        Self {
            model: model.to_string(),
            emission: Emission::WholeFragment,
        }
    }

    #[must_use]
    pub fn with_emission(mut self, emission: Emission) -> Self {
        self.emission = emission;
        self
    }

    fn price() -> PriceEntry {
        PriceEntry::free("USD")
    }
}

impl Default for DummyModelProvider {
    fn default() -> Self {
        Self::new("")
    }
}

#[async_trait]
impl ModelProvider for DummyModelProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn mode(&self) -> ModelMode {
        ModelMode::Chat
    }

    fn pricing_summary(&self) -> &'static str {
        DUMMY_PRICING
    }

    fn calculate_price(&self, result: &mut ModelResult) -> Result<(), ModelError> {
        apply_price(&Self::price(), result);
        Ok(())
    }

    async fn query_text(
        &self,
        request: &QueryRequest<'_>,
        sink: &mut dyn EventSink,
    ) -> Result<ModelResult, ModelError> {
        ensure_flushable(sink)?;
        let counter = TokenCounter::for_model(COUNTING_MODEL)?;
        let answer = request
            .knowledge
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or(request.question);

        let mut accounting = Accounting::new(counter, Self::price(), counter.count(request.question));
        let mut emission = self.emission.strategy();
        for word in answer.split_inclusive(' ') {
            emission.emit(word, sink).await?;
            accounting.add_response(word);
        }
        Ok(accounting.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawMessage;
    use crate::services::model::MemorySink;

    #[tokio::test]
    async fn test_echoes_top_passage_word_by_word() {
        let knowledge = vec![
            RawMessage::system("Rust has no garbage collector."),
            RawMessage::system("unrelated"),
        ];
        let request = QueryRequest {
            knowledge: &knowledge,
            ..QueryRequest::new("Does Rust have a GC?")
        };
        let mut sink = MemorySink::new();
        let result = DummyModelProvider::default()
            .query_text(&request, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.fragments.len(), 5);
        assert_eq!(sink.text(), "Rust has no garbage collector.");
        assert!(result.response_token_count > 0);
        assert_eq!(result.total_price, 0.0);
        assert_eq!(result.currency, "USD");
    }

    #[tokio::test]
    async fn test_echoes_question_without_knowledge() {
        let mut sink = MemorySink::new();
        DummyModelProvider::new("echo")
            .query_text(&QueryRequest::new("hello there"), &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.fragments, vec!["hello ", "there"]);
    }
}
