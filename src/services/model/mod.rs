//! Streaming answer generation over a closed set of backends.

mod dummy;
mod emit;
mod openai;
mod qwen;
mod sink;
mod sse;

pub use dummy::DummyModelProvider;
pub use emit::{
    Emission, EmissionStrategy, MAX_CHAR_DELAY_MS, TypingPace, WholeFragment, char_delay,
    is_latin_script,
};
pub use openai::{OpenAiFlavor, OpenAiModelProvider, image_html, image_src};
pub use qwen::QwenModelProvider;
pub use sink::{EventSink, MemorySink, PlainWriter, RecordingSink, SseWriter};
pub use sse::{SseData, SseDecoder, delta_stream, encode_frame};

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use tracing::debug;

use crate::error::{ConfigError, ModelError};
use crate::models::{
    ModelResult, ProviderCategory, ProviderConfig, RawMessage, TypingPace as PaceSetting,
};
use crate::repository::ProviderRepository;
use crate::services::pricing::{PriceEntry, apply_price};
use crate::services::provider::lookup_provider;
use crate::services::tokens::TokenCounter;

/// How a model is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMode {
    /// Structured message list, streamed deltas.
    Chat,
    /// Single prompt string, streamed text.
    Completion,
    /// One synchronous request producing an image reference.
    Image,
}

impl ModelMode {
    pub fn for_model(model: &str) -> Self {
        if model.contains("dall-e") {
            ModelMode::Image
        } else if model.ends_with("-instruct")
            || model.contains("davinci")
            || model.contains("babbage")
        {
            ModelMode::Completion
        } else {
            ModelMode::Chat
        }
    }
}

/// Everything a backend needs to answer one question.
#[derive(Debug, Clone, Copy)]
pub struct QueryRequest<'a> {
    pub question: &'a str,
    pub history: &'a [RawMessage],
    pub system_prompt: &'a str,
    /// Retrieved passages, best first.
    pub knowledge: &'a [RawMessage],
}

impl<'a> QueryRequest<'a> {
    pub fn new(question: &'a str) -> Self {
        Self {
            question,
            history: &[],
            system_prompt: "",
            knowledge: &[],
        }
    }
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn model(&self) -> &str;

    fn mode(&self) -> ModelMode;

    /// Human-readable price list of the backend family.
    fn pricing_summary(&self) -> &'static str;

    /// Recompute `result.total_price` from its counts. Unknown models fail.
    fn calculate_price(&self, result: &mut ModelResult) -> Result<(), ModelError>;

    /// Stream an answer into `sink` and return the final usage. On error the
    /// fragments already sent stay sent.
    async fn query_text(
        &self,
        request: &QueryRequest<'_>,
        sink: &mut dyn EventSink,
    ) -> Result<ModelResult, ModelError>;
}

/// Refuse sinks that cannot push fragments out one at a time.
pub(crate) fn ensure_flushable(sink: &dyn EventSink) -> Result<(), ModelError> {
    if sink.supports_flush() {
        Ok(())
    } else {
        Err(ModelError::FlushUnsupported)
    }
}

/// Running usage of one stream. Owned by a single request.
pub struct Accounting {
    counter: TokenCounter,
    price: PriceEntry,
    result: ModelResult,
}

impl Accounting {
    pub fn new(counter: TokenCounter, price: PriceEntry, prompt_tokens: u64) -> Self {
        let mut result = ModelResult::with_prompt_tokens(prompt_tokens);
        apply_price(&price, &mut result);
        Self {
            counter,
            price,
            result,
        }
    }

    pub fn add_response(&mut self, fragment: &str) {
        self.result.add_response_tokens(self.counter.count(fragment));
        apply_price(&self.price, &mut self.result);
    }

    pub fn result(&self) -> &ModelResult {
        &self.result
    }

    pub fn finish(self) -> ModelResult {
        self.result
    }
}

/// Forward stream deltas to the sink and account for each.
///
/// Newline-only deltas before the first real content are dropped. Empty deltas
/// are skipped. The first stream error ends the relay.
pub async fn relay_stream<S>(
    mut deltas: S,
    accounting: &mut Accounting,
    emission: &mut dyn EmissionStrategy,
    sink: &mut dyn EventSink,
) -> Result<(), ModelError>
where
    S: Stream<Item = Result<String, ModelError>> + Unpin + Send,
{
    let mut leading = true;
    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        if delta.is_empty() {
            continue;
        }
        if leading {
            if delta.chars().all(|c| c == '\n') {
                continue;
            }
            leading = false;
        }

        emission.emit(&delta, sink).await?;
        accounting.add_response(&delta);
    }
    debug!(
        response_tokens = accounting.result().response_token_count,
        "stream finished"
    );
    Ok(())
}

/// Turn a non-success response into a server error carrying status and body.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ModelError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ModelError::ServerError(format!("status {status}: {body}")))
}

fn emission_for(default: Emission, setting: PaceSetting) -> Emission {
    match setting {
        PaceSetting::Auto => default,
        PaceSetting::On => Emission::TypingPace,
        PaceSetting::Off => Emission::WholeFragment,
    }
}

/// Build the backend for a provider record, keyed by its type.
pub fn create_model_provider(
    provider: &ProviderConfig,
    client: Client,
    pace: PaceSetting,
) -> Result<Box<dyn ModelProvider>, ConfigError> {
    let backend: Box<dyn ModelProvider> = match provider.provider_type.as_str() {
        "OpenAI" => Box::new(
            OpenAiModelProvider::new(client, provider, OpenAiFlavor::OpenAi)?
                .with_emission(emission_for(Emission::WholeFragment, pace)),
        ),
        "Azure" => Box::new(
            OpenAiModelProvider::new(client, provider, OpenAiFlavor::Azure)?
                .with_emission(emission_for(Emission::TypingPace, pace)),
        ),
        "Local" => Box::new(
            OpenAiModelProvider::new(client, provider, OpenAiFlavor::Local)?
                .with_emission(emission_for(Emission::WholeFragment, pace)),
        ),
        "Qwen" => Box::new(
            QwenModelProvider::new(client, provider)
                .with_emission(emission_for(Emission::WholeFragment, pace)),
        ),
        "Dummy" => Box::new(
            DummyModelProvider::new(&provider.sub_type)
                .with_emission(emission_for(Emission::WholeFragment, pace)),
        ),
        other => {
            return Err(ConfigError::UnsupportedProviderType {
                category: ProviderCategory::Model.noun().to_string(),
                provider_type: other.to_string(),
            });
        }
    };
    Ok(backend)
}

/// Look up, validate and build a model provider. An empty `name` picks the
/// default one.
pub async fn resolve_model_provider(
    repo: &dyn ProviderRepository,
    owner: &str,
    name: &str,
    client: Client,
    pace: PaceSetting,
) -> Result<(ProviderConfig, Box<dyn ModelProvider>), ConfigError> {
    let provider = lookup_provider(repo, owner, name, ProviderCategory::Model).await?;
    let backend = create_model_provider(&provider, client, pace)?;
    Ok((provider, backend))
}
