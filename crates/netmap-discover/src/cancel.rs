//! One-shot cancellation signal shared between a scan job and its
//! reconciliation task.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable cancellation token.
///
/// Every clone observes the same flag. `cancel` may be called any number of
/// times from any number of callers; only the first call changes anything.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Returns `true` only for the call that flipped
    /// the flag.
    pub fn cancel(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called (immediately if it already
    /// was).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so the channel cannot close
        // while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
