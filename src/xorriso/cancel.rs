//! Cancellation handle shared between a caller and a running invocation

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancel flag that running invocations can await
///
/// Cancelling is sticky: once set it stays set, and every clone sees it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
