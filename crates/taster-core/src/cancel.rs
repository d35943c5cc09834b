//! Process-wide cooperative cancellation.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable cancellation flag backed by a `watch` channel.
///
/// Once cancelled it stays cancelled. Workers poll [`CancelSignal::is_cancelled`]
/// at checkpoints; the scheduler awaits [`CancelSignal::cancelled`] while
/// waiting for a free worker.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
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

    /// Resolves once [`CancelSignal::cancel`] has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
