//! Bounded background polling: wait for an external asset, then patch a record.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::JobsConfig;
use crate::repository::MessageRepository;
use crate::services::model::image_html;
use crate::utils::{CancelHandle, CancelToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&JobsConfig> for PollSettings {
    fn from(config: &JobsConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_secs),
            max_attempts: config.poll_max_attempts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The probe succeeded on this attempt.
    Ready { attempts: u32 },
    /// Every attempt failed.
    Exhausted { attempts: u32 },
    Cancelled,
}

/// A running poll job. Dropping it detaches the job; it still stops on its own.
#[derive(Debug)]
pub struct PollJob {
    cancel: CancelHandle,
    task: JoinHandle<PollOutcome>,
}

impl PollJob {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to stop and report why it did.
    pub async fn wait(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("poll job aborted: {e}");
                PollOutcome::Cancelled
            }
        }
    }
}

/// Run `probe` up to `max_attempts` times, `interval` apart, until it returns
/// true. The first attempt runs immediately.
pub fn spawn_poll_job<F, Fut>(settings: PollSettings, mut probe: F) -> PollJob
where
    F: FnMut(u32) -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send,
{
    let (cancel, mut token) = CancelToken::new();
    let task = tokio::spawn(async move {
        for attempt in 1..=settings.max_attempts {
            if token.is_cancelled() {
                return PollOutcome::Cancelled;
            }
            if probe(attempt).await {
                return PollOutcome::Ready { attempts: attempt };
            }
            if attempt == settings.max_attempts {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(settings.interval) => {}
                _ = token.cancelled() => return PollOutcome::Cancelled,
            }
        }
        PollOutcome::Exhausted {
            attempts: settings.max_attempts,
        }
    });
    PollJob { cancel, task }
}

/// Wait for a generated image to become reachable, then write its final
/// markup into the reply message.
pub fn spawn_image_job(
    client: Client,
    messages: Arc<dyn MessageRepository>,
    owner: String,
    name: String,
    url: String,
    settings: PollSettings,
) -> PollJob {
    spawn_poll_job(settings, move |attempt| {
        let client = client.clone();
        let messages = Arc::clone(&messages);
        let owner = owner.clone();
        let name = name.clone();
        let url = url.clone();
        async move {
            match client.get(&url).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::OK => {}
                Ok(response) => {
                    debug!(attempt, status = %response.status(), "image not ready");
                    return false;
                }
                Err(e) => {
                    debug!(attempt, "image probe failed: {e}");
                    return false;
                }
            }

            match messages.get_message(&owner, &name).await {
                Ok(Some(mut message)) => {
                    message.text = image_html(&url);
                    if let Err(e) = messages.update_message(&message).await {
                        warn!("failed to patch message {owner}/{name}: {e}");
                        return false;
                    }
                    info!("image ready for message {owner}/{name}");
                    true
                }
                Ok(None) => {
                    warn!("message {owner}/{name} is gone, stopping image job");
                    true
                }
                Err(e) => {
                    warn!("failed to load message {owner}/{name}: {e}");
                    false
                }
            }
        }
    })
}
