//! Cancellation support for git batches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Cancels a running batch. Cloning shares the same flag.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create a new cancellation token and its watcher.
    pub fn new() -> (Self, CancellationWatcher) {
        let (tx, rx) = watch::channel(false);
        let cancelled = Arc::new(AtomicBool::new(false));

        let token = Self {
            cancelled: cancelled.clone(),
            notify: Arc::new(tx),
        };

        let watcher = CancellationWatcher {
            cancelled,
            notify: rx,
        };

        (token, watcher)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _ = self.notify.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Observes a [`CancellationToken`]. Cheap to clone, one per task.
#[derive(Clone)]
pub struct CancellationWatcher {
    cancelled: Arc<AtomicBool>,
    notify: watch::Receiver<bool>,
}

impl CancellationWatcher {
    /// A watcher whose token is already gone, so it never fires
    pub fn never() -> Self {
        CancellationToken::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for cancellation.
    pub async fn cancelled(&mut self) {
        while !*self.notify.borrow_and_update() {
            if self.notify.changed().await.is_err() {
                // Every token was dropped without cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}
