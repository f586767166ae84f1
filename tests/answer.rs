use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use ragchat::error::{AnswerError, ConfigError, ModelError, RepositoryError, SearchError};
use ragchat::models::{
    Config, IngestionConfig, Message, ProviderCategory, ProviderConfig, StoreConfig,
};
use ragchat::repository::{ConfigRepository, MemoryRepository, MessageRepository};
use ragchat::services::embedding::DummyEmbeddingProvider;
use ragchat::services::model::MemorySink;
use ragchat::services::{
    AnswerRequest, AnswerService, AnswerSettings, EmbeddingRateLimiter, IngestPipeline,
};
use ragchat::storage::LocalObjectStorage;
use ragchat::utils::CancelToken;

const BORROW: &str = "The borrow checker enforces ownership rules at compile time.";
const TOKIO: &str = "Tokio is an asynchronous runtime for network services.";

fn catalog(root: &Path) -> Arc<ConfigRepository> {
    let mut store = StoreConfig::new("docs");
    store.storage_root = Some(root.to_path_buf());
    store.is_default = true;

    Arc::new(ConfigRepository::new(
        vec![
            ProviderConfig::new("echo", ProviderCategory::Model, "Dummy", "").as_default(),
            ProviderConfig::new("hash", ProviderCategory::Embedding, "Dummy", "512").as_default(),
        ],
        vec![store, StoreConfig::new("empty")],
    ))
}

async fn ingest(root: &Path, repo: Arc<MemoryRepository>) {
    std::fs::write(root.join("a.txt"), BORROW).unwrap();
    std::fs::write(root.join("b.txt"), TOKIO).unwrap();
    IngestPipeline::new(
        Arc::new(LocalObjectStorage::new(root.to_path_buf())),
        Arc::new(DummyEmbeddingProvider::new(512)),
        repo,
        Arc::new(EmbeddingRateLimiter::new(100, std::time::Duration::from_secs(60)).unwrap()),
        &IngestionConfig::default(),
    )
    .ingest("admin", "docs", "", &CancelToken::never())
    .await
    .unwrap();
}

fn service(catalog: Arc<ConfigRepository>, repo: Arc<MemoryRepository>) -> AnswerService {
    AnswerService::new(
        catalog.clone(),
        catalog,
        repo.clone(),
        repo,
        Client::new(),
        AnswerSettings::from_config(&Config::default()),
    )
}

#[tokio::test]
async fn answers_from_best_passage_and_patches_reply() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(MemoryRepository::new());
    ingest(dir.path(), repo.clone()).await;
    let reply = Message::new("admin", "message_reply", "chat_1", "AI", "");
    repo.add_message(&reply).await.unwrap();

    let request = AnswerRequest {
        reply: Some("message_reply"),
        ..AnswerRequest::new("admin", "", "borrow checker ownership rules compile time")
    };
    let mut sink = MemorySink::new();
    let answer = service(catalog(dir.path()), repo.clone())
        .answer(&request, &mut sink)
        .await
        .unwrap();

    assert_eq!(answer.store, "docs");
    assert_eq!(answer.text, BORROW);
    assert_eq!(sink.text(), BORROW);
    assert_eq!(answer.passages.len(), 1);
    assert_eq!(answer.passages[0].vector.file, "a.txt");
    assert_eq!(answer.result.total_price, 0.0);
    assert!(answer.image_job.is_none());

    let patched = repo
        .get_message("admin", "message_reply")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(patched.text, BORROW);
    assert_eq!(patched.vector_scores.len(), 1);
    assert_eq!(patched.vector_scores[0].vector, answer.passages[0].vector.name);
}

#[tokio::test]
async fn empty_store_reports_no_vectors() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(MemoryRepository::new());
    let mut sink = MemorySink::new();

    let err = service(catalog(dir.path()), repo)
        .answer(&AnswerRequest::new("admin", "empty", "anything?"), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AnswerError::Search(SearchError::NoVectors(ref store)) if store == "admin/empty"
    ));
    assert!(sink.fragments.is_empty());
}

#[tokio::test]
async fn unknown_store_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(MemoryRepository::new());
    let mut sink = MemorySink::new();

    let err = service(catalog(dir.path()), repo)
        .answer(&AnswerRequest::new("admin", "missing", "q"), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, AnswerError::Config(ConfigError::StoreNotFound(_))));
}

#[tokio::test]
async fn buffered_destination_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(MemoryRepository::new());
    ingest(dir.path(), repo.clone()).await;
    let mut sink = MemorySink::buffered();

    let err = service(catalog(dir.path()), repo)
        .answer(&AnswerRequest::new("admin", "docs", "runtime"), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, AnswerError::Model(ModelError::FlushUnsupported)));
    assert!(sink.fragments.is_empty());
}

/// Message store whose every call fails.
struct UnavailableMessages;

#[async_trait]
impl MessageRepository for UnavailableMessages {
    async fn add_message(&self, _message: &Message) -> Result<(), RepositoryError> {
        Err(RepositoryError::Poisoned)
    }

    async fn get_message(
        &self,
        _owner: &str,
        _name: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        Err(RepositoryError::Poisoned)
    }

    async fn update_message(&self, _message: &Message) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Poisoned)
    }
}

#[tokio::test]
async fn model_error_wins_over_failed_reply_patch() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(MemoryRepository::new());
    ingest(dir.path(), repo.clone()).await;
    let catalog = catalog(dir.path());
    let service = AnswerService::new(
        catalog.clone(),
        catalog,
        repo,
        Arc::new(UnavailableMessages),
        Client::new(),
        AnswerSettings::from_config(&Config::default()),
    );

    let request = AnswerRequest {
        reply: Some("message_reply"),
        ..AnswerRequest::new("admin", "docs", "runtime")
    };
    let mut sink = MemorySink::buffered();
    let err = service.answer(&request, &mut sink).await.unwrap_err();

    assert!(matches!(err, AnswerError::Model(ModelError::FlushUnsupported)));
}
