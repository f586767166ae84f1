//! Question → retrieved knowledge → streamed answer → patched reply message.

use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{AnswerError, ConfigError};
use crate::models::{
    ChatConfig, Config, DEFAULT_STORE_NAME, ModelResult, RawMessage, StoreConfig,
    TypingPace as PaceSetting,
};
use crate::repository::{MessageRepository, ProviderRepository, StoreRepository, VectorRepository};
use crate::services::embedding::resolve_embedding_provider;
use crate::services::jobs::{PollJob, PollSettings, spawn_image_job};
use crate::services::model::{
    EventSink, ModelMode, QueryRequest, RecordingSink, image_src, resolve_model_provider,
};
use crate::services::prompt::knowledge_messages;
use crate::services::retrieval::{RetrievedPassage, Retriever};
use crate::utils::RetryConfig;

#[derive(Debug, Clone)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub system_prompt: String,
    pub typing_pace: PaceSetting,
    pub retry: RetryConfig,
    pub poll: PollSettings,
}

impl AnswerSettings {
    pub fn from_config(config: &Config) -> Self {
        let ChatConfig {
            system_prompt,
            typing_pace,
        } = config.chat.clone();
        Self {
            top_k: config.retrieval.top_k.max(1),
            system_prompt,
            typing_pace,
            retry: config.ingestion.retry_config(),
            poll: PollSettings::from(&config.jobs),
        }
    }
}

/// Find a store by name. Empty or the well-known default name picks the
/// owner's default store.
pub async fn resolve_store(
    stores: &dyn StoreRepository,
    owner: &str,
    name: &str,
) -> Result<StoreConfig, ConfigError> {
    let store = if name.is_empty() || name == DEFAULT_STORE_NAME {
        stores.get_default_store(owner).await?
    } else {
        stores.get_store(owner, name).await?
    };
    store.ok_or_else(|| {
        let shown = if name.is_empty() { DEFAULT_STORE_NAME } else { name };
        ConfigError::StoreNotFound(format!("{owner}/{shown}"))
    })
}

/// One question to answer.
#[derive(Debug, Clone, Copy)]
pub struct AnswerRequest<'a> {
    pub owner: &'a str,
    /// Store name. Empty or the well-known default name picks the owner's
    /// default store.
    pub store: &'a str,
    pub question: &'a str,
    pub history: &'a [RawMessage],
    /// Stored message that receives the answer text and vector scores.
    pub reply: Option<&'a str>,
}

impl<'a> AnswerRequest<'a> {
    pub fn new(owner: &'a str, store: &'a str, question: &'a str) -> Self {
        Self {
            owner,
            store,
            question,
            history: &[],
            reply: None,
        }
    }
}

#[derive(Debug)]
pub struct Answer {
    pub store: String,
    pub model: String,
    pub text: String,
    pub passages: Vec<RetrievedPassage>,
    pub result: ModelResult,
    /// Present when an image answer is still being fetched.
    pub image_job: Option<PollJob>,
}

pub struct AnswerService {
    providers: Arc<dyn ProviderRepository>,
    stores: Arc<dyn StoreRepository>,
    vectors: Arc<dyn VectorRepository>,
    messages: Arc<dyn MessageRepository>,
    client: Client,
    settings: AnswerSettings,
}

impl AnswerService {
    pub fn new(
        providers: Arc<dyn ProviderRepository>,
        stores: Arc<dyn StoreRepository>,
        vectors: Arc<dyn VectorRepository>,
        messages: Arc<dyn MessageRepository>,
        client: Client,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            providers,
            stores,
            vectors,
            messages,
            client,
            settings,
        }
    }

    /// Answer a question, streaming fragments into `sink`.
    ///
    /// When the stream fails part-way, the reply message still receives the
    /// text that was already sent before the error is returned.
    pub async fn answer(
        &self,
        request: &AnswerRequest<'_>,
        sink: &mut dyn EventSink,
    ) -> Result<Answer, AnswerError> {
        let store = resolve_store(self.stores.as_ref(), request.owner, request.store).await?;
        let (_, embedder) = resolve_embedding_provider(
            self.providers.as_ref(),
            request.owner,
            &store.embedding_provider,
            self.client.clone(),
        )
        .await?;
        let (_, model) = resolve_model_provider(
            self.providers.as_ref(),
            request.owner,
            &store.model_provider,
            self.client.clone(),
            self.settings.typing_pace,
        )
        .await?;

        let retriever = Retriever::new(
            Arc::clone(&self.vectors),
            Arc::from(embedder),
            self.settings.retry.clone(),
        );
        let passages = retriever
            .retrieve(&store.owner, &store.name, request.question, self.settings.top_k)
            .await?;
        debug!(
            store = %store.name,
            top_score = passages.first().map(|p| p.score),
            "knowledge retrieved"
        );

        let knowledge = knowledge_messages(passages.iter().map(|p| p.vector.text.as_str()));
        let system_prompt = store
            .system_prompt
            .as_deref()
            .unwrap_or(&self.settings.system_prompt);
        let query = QueryRequest {
            question: request.question,
            history: request.history,
            system_prompt,
            knowledge: &knowledge,
        };

        let mut recorder = RecordingSink::new(sink);
        let outcome = model.query_text(&query, &mut recorder).await;
        let text = recorder.into_text();

        if let Some(reply) = request.reply {
            let patched = self.patch_reply(request.owner, reply, &text, &passages).await;
            match (&outcome, patched) {
                (Err(_), Err(e)) => warn!(error = %e, "failed to record partial answer"),
                (Ok(_), Err(e)) => return Err(e),
                (_, Ok(())) => {}
            }
        }
        let result = outcome?;
        info!(
            model = model.model(),
            total_tokens = result.total_token_count,
            price = result.total_price,
            currency = %result.currency,
            "answer complete"
        );

        let image_job = match (model.mode(), request.reply, image_src(&text)) {
            (ModelMode::Image, Some(reply), Some(url)) => Some(spawn_image_job(
                self.client.clone(),
                Arc::clone(&self.messages),
                request.owner.to_string(),
                reply.to_string(),
                url.to_string(),
                self.settings.poll,
            )),
            _ => None,
        };

        Ok(Answer {
            store: store.name,
            model: model.model().to_string(),
            text,
            passages,
            result,
            image_job,
        })
    }

    async fn patch_reply(
        &self,
        owner: &str,
        name: &str,
        text: &str,
        passages: &[RetrievedPassage],
    ) -> Result<(), AnswerError> {
        let Some(mut message) = self.messages.get_message(owner, name).await? else {
            warn!("reply message {owner}/{name} not found, answer not recorded");
            return Ok(());
        };
        message.text = text.to_string();
        message.vector_scores = passages.iter().map(RetrievedPassage::score_record).collect();
        self.messages.update_message(&message).await?;
        Ok(())
    }
}
