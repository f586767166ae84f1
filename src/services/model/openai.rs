use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    Accounting, Emission, EventSink, ModelMode, ModelProvider, QueryRequest, check_status,
    delta_stream, ensure_flushable, relay_stream,
};
use crate::error::{ConfigError, ModelError};
use crate::models::{ModelResult, ProviderConfig, RawMessage};
use crate::services::pricing::{OPENAI_PRICING, apply_price, openai_price, price_entry};
use crate::services::prompt::{build_chat_messages, joined_knowledge, refined_question};
use crate::services::tokens::{TokenCounter, context_window};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";
const RESPONSE_RESERVE: u64 = 1024;
const IMAGE_SIZE: &str = "1024x1024";

/// Which OpenAI-compatible surface a provider talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAiFlavor {
    OpenAi,
    Azure,
    /// Self-hosted server exposing the OpenAI routes.
    Local,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct Sampling {
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [RawMessage],
    stream: bool,
    #[serde(flatten)]
    sampling: Sampling,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(flatten)]
    sampling: Sampling,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: String,
}

/// HTML fragment that stands in for the answer of an image model.
pub fn image_html(url: &str) -> String {
    format!("<img src=\"{url}\" width=\"100%\" height=\"auto\">")
}

/// The image URL inside an answer produced by [`image_html`].
pub fn image_src(html: &str) -> Option<&str> {
    let rest = html.strip_prefix("<img src=\"")?;
    rest.split_once('"').map(|(url, _)| url)
}

fn chat_delta(value: &serde_json::Value) -> Option<String> {
    value["choices"][0]["delta"]["content"]
        .as_str()
        .map(str::to_string)
}

fn completion_delta(value: &serde_json::Value) -> Option<String> {
    value["choices"][0]["text"].as_str().map(str::to_string)
}

fn required_url(provider: &ProviderConfig) -> Result<String, ConfigError> {
    provider
        .provider_url
        .as_deref()
        .map(|u| u.trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "provider {} requires a provider_url",
                provider.id()
            ))
        })
}

/// Chat, completion and image generation over the OpenAI wire protocol.
pub struct OpenAiModelProvider {
    client: Client,
    flavor: OpenAiFlavor,
    base: String,
    secret: String,
    deployment: String,
    api_version: String,
    model: String,
    sampling: Sampling,
    emission: Emission,
}

impl OpenAiModelProvider {
    pub fn new(
        client: Client,
        provider: &ProviderConfig,
        flavor: OpenAiFlavor,
    ) -> Result<Self, ConfigError> {
        let base = match flavor {
            OpenAiFlavor::OpenAi => provider
                .provider_url
                .as_deref()
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            OpenAiFlavor::Azure | OpenAiFlavor::Local => required_url(provider)?,
        };
        let model = if provider.sub_type.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            provider.sub_type.clone()
        };

        Ok(Self {
            client,
            flavor,
            base,
            secret: provider.client_secret.clone(),
            deployment: provider
                .deployment_name
                .clone()
                .unwrap_or_else(|| model.clone()),
            api_version: provider
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            model,
            sampling: Sampling {
                temperature: provider.temperature,
                top_p: provider.top_p,
                frequency_penalty: provider.frequency_penalty,
                presence_penalty: provider.presence_penalty,
            },
            emission: Emission::WholeFragment,
        })
    }

    #[must_use]
    pub fn with_emission(mut self, emission: Emission) -> Self {
        self.emission = emission;
        self
    }

    fn endpoint(&self, route: &str) -> String {
        match self.flavor {
            OpenAiFlavor::Azure => format!(
                "{}/openai/deployments/{}/{route}?api-version={}",
                self.base, self.deployment, self.api_version
            ),
            OpenAiFlavor::OpenAi | OpenAiFlavor::Local => format!("{}/{route}", self.base),
        }
    }

    fn post(&self, route: &str) -> RequestBuilder {
        let request = self.client.post(self.endpoint(route));
        match self.flavor {
            OpenAiFlavor::Azure => request.header("api-key", &self.secret),
            _ if self.secret.is_empty() => request,
            _ => request.bearer_auth(&self.secret),
        }
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &T,
    ) -> Result<reqwest::Response, ModelError> {
        let response = self
            .post(route)
            .json(body)
            .send()
            .await
            .map_err(ModelError::RequestError)?;
        check_status(response).await
    }

    async fn query_chat(
        &self,
        request: &QueryRequest<'_>,
        sink: &mut dyn EventSink,
    ) -> Result<ModelResult, ModelError> {
        let price = price_entry(openai_price, &self.model)?;
        let counter = TokenCounter::for_model(&self.model)?;
        let window = context_window(&self.model);
        let messages = build_chat_messages(
            request.system_prompt,
            request.history,
            request.knowledge,
            request.question,
            &counter,
            window.saturating_sub(RESPONSE_RESERVE.min(window / 4)),
        );
        let prompt_tokens = counter.count_messages(&messages);
        debug!(model = %self.model, messages = messages.len(), prompt_tokens, "chat request");

        let body = ChatRequest {
            model: &self.model,
            messages: &messages,
            stream: true,
            sampling: self.sampling,
        };
        let response = self.send("chat/completions", &body).await?;

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

    async fn query_completion(
        &self,
        request: &QueryRequest<'_>,
        sink: &mut dyn EventSink,
    ) -> Result<ModelResult, ModelError> {
        let price = price_entry(openai_price, &self.model)?;
        let counter = TokenCounter::for_model(&self.model)?;
        let prompt = refined_question(&joined_knowledge(request.knowledge), request.question);
        let prompt_tokens = counter.count(&prompt);
        debug!(model = %self.model, prompt_tokens, "completion request");

        let body = CompletionRequest {
            model: &self.model,
            prompt: &prompt,
            stream: true,
            sampling: self.sampling,
        };
        let response = self.send("completions", &body).await?;

        let mut accounting = Accounting::new(counter, price, prompt_tokens);
        let mut emission = self.emission.strategy();
        relay_stream(
            delta_stream(response.bytes_stream(), completion_delta),
            &mut accounting,
            emission.as_mut(),
            sink,
        )
        .await?;
        Ok(accounting.finish())
    }

    async fn query_image(
        &self,
        request: &QueryRequest<'_>,
        sink: &mut dyn EventSink,
    ) -> Result<ModelResult, ModelError> {
        let price = price_entry(openai_price, &self.model)?;
        let body = ImageRequest {
            model: &self.model,
            prompt: request.question,
            n: 1,
            size: IMAGE_SIZE,
        };
        let response: ImageResponse = self
            .send("images/generations", &body)
            .await?
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        let url = response
            .data
            .into_iter()
            .next()
            .map(|d| d.url)
            .ok_or_else(|| ModelError::InvalidResponse("no image returned".to_string()))?;

        sink.send(&image_html(&url)).await?;

        let mut result = ModelResult {
            image_count: 1,
            ..Default::default()
        };
        apply_price(&price, &mut result);
        Ok(result)
    }
}

#[async_trait]
impl ModelProvider for OpenAiModelProvider {
    fn model(&self) -> &str {
        &self.model
    }

    fn mode(&self) -> ModelMode {
        ModelMode::for_model(&self.model)
    }

    fn pricing_summary(&self) -> &'static str {
        OPENAI_PRICING
    }

    fn calculate_price(&self, result: &mut ModelResult) -> Result<(), ModelError> {
        let price = price_entry(openai_price, &self.model)?;
        apply_price(&price, result);
        Ok(())
    }

    async fn query_text(
        &self,
        request: &QueryRequest<'_>,
        sink: &mut dyn EventSink,
    ) -> Result<ModelResult, ModelError> {
        ensure_flushable(sink)?;
        match self.mode() {
            ModelMode::Chat => self.query_chat(request, sink).await,
            ModelMode::Completion => self.query_completion(request, sink).await,
            ModelMode::Image => self.query_image(request, sink).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderCategory;
    use crate::services::model::MemorySink;

    fn provider(sub_type: &str) -> ProviderConfig {
        ProviderConfig::new("gpt", ProviderCategory::Model, "OpenAI", sub_type).with_secret("sk")
    }

    #[test]
    fn test_endpoints_per_flavor() {
        let openai =
            OpenAiModelProvider::new(Client::new(), &provider("gpt-4"), OpenAiFlavor::OpenAi)
                .unwrap();
        assert_eq!(
            openai.endpoint("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );

        let mut azure_config = provider("gpt-4").with_url("https://res.openai.azure.com/");
        azure_config.deployment_name = Some("prod-gpt4".to_string());
        let azure =
            OpenAiModelProvider::new(Client::new(), &azure_config, OpenAiFlavor::Azure).unwrap();
        assert_eq!(
            azure.endpoint("chat/completions"),
            "https://res.openai.azure.com/openai/deployments/prod-gpt4/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn test_local_requires_url() {
        let result = OpenAiModelProvider::new(Client::new(), &provider("llama"), OpenAiFlavor::Local);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_image_html_round_trip() {
        let html = image_html("https://img.example/a.png");
        assert_eq!(
            html,
            r#"<img src="https://img.example/a.png" width="100%" height="auto">"#
        );
        assert_eq!(image_src(&html), Some("https://img.example/a.png"));
        assert_eq!(image_src("plain text"), None);
    }

    #[test]
    fn test_calculate_price_unknown_model() {
        let backend =
            OpenAiModelProvider::new(Client::new(), &provider("mystery-7b"), OpenAiFlavor::OpenAi)
                .unwrap();
        let mut result = ModelResult::with_prompt_tokens(100);
        let err = backend.calculate_price(&mut result).unwrap_err();
        assert_eq!(err.to_string(), "unknown model type: mystery-7b");
    }

    #[test]
    fn test_calculate_price_is_idempotent() {
        let backend =
            OpenAiModelProvider::new(Client::new(), &provider("gpt-4"), OpenAiFlavor::OpenAi)
                .unwrap();
        let mut result = ModelResult::with_prompt_tokens(1000);
        result.add_response_tokens(1000);
        backend.calculate_price(&mut result).unwrap();
        let first = result.total_price;
        backend.calculate_price(&mut result).unwrap();
        assert!((first - 0.09).abs() < 1e-9);
        assert_eq!(result.total_price, first);
        assert_eq!(result.currency, "USD");
    }

    #[tokio::test]
    async fn test_buffered_sink_rejected_before_any_request() {
        let backend = OpenAiModelProvider::new(
            Client::new(),
            &provider("gpt-4").with_url("http://127.0.0.1:9"),
            OpenAiFlavor::OpenAi,
        )
        .unwrap();
        let mut sink = MemorySink::buffered();
        let err = backend
            .query_text(&QueryRequest::new("hi"), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::FlushUnsupported));
        assert!(sink.fragments.is_empty());
    }

    #[test]
    fn test_delta_extractors() {
        let chat = serde_json::json!({"choices": [{"delta": {"content": "Hi"}}]});
        assert_eq!(chat_delta(&chat).as_deref(), Some("Hi"));
        let role_only = serde_json::json!({"choices": [{"delta": {"role": "assistant"}}]});
        assert_eq!(chat_delta(&role_only), None);
        let completion = serde_json::json!({"choices": [{"text": " there"}]});
        assert_eq!(completion_delta(&completion).as_deref(), Some(" there"));
    }
}
