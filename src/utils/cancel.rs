//! Cancellation signal shared between a request and the work it spawned.

use tokio::sync::watch;

/// Sending half: fires the cancellation.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may already be gone; nothing left to cancel then.
        let _ = self.tx.send(true);
    }
}

/// Receiving half, cheap to clone into every task that must observe the request.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a linked handle/token pair.
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that is never cancelled.
    pub fn never() -> CancelToken {
        let (_, token) = Self::new();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the handle fires. Pends forever if the handle was dropped
    /// without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (handle, mut token) = CancelToken::new();
        let waiter = tokio::spawn(async move {
            token.cancelled().await;
            true
        });
        handle.cancel();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_token_stays_pending() {
        let mut token = CancelToken::never();
        assert!(!token.is_cancelled());
        let res = tokio::time::timeout(Duration::from_secs(5), token.cancelled()).await;
        assert!(res.is_err());
    }
}
