//! Cooperative cancellation.
//!
//! A [`CancelHandle`] is held by the engine; [`CancelToken`] clones travel
//! into every task and executor call. Every await in the hot path selects
//! on `cancelled()` so a shutdown can unwind working orders before the task
//! exits.

use tokio::sync::watch;

/// Owner side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observer side; cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// Signal cancellation to every token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelToken {
    /// True once cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is signalled (immediately if it already
    /// was).
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow_and_update() {
            return;
        }
        // The sender dropping also means the run is over.
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }

    /// A token that never fires; for tests and standalone component use.
    pub fn never() -> CancelToken {
        let (tx, rx) = watch::channel(false);
        // Leak the sender so the channel stays open for the process.
        std::mem::forget(tx);
        CancelToken { rx }
    }
}
