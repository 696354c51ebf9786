//! Cooperative cancellation for pipeline requests.

use tokio::sync::watch;

/// Receiving side of a cancellation flag. `true` means cancelled.
pub type CancelSignal = watch::Receiver<bool>;

/// Sending side of a cancellation flag.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Flag every subscribed signal as cancelled.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// A new signal observing this handle.
    pub fn subscribe(&self) -> CancelSignal {
        self.tx.subscribe()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Create a connected handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, rx)
}

/// A signal that can never fire (its sender is already gone).
pub fn never_cancelled() -> CancelSignal {
    watch::channel(false).1
}

/// Whether the signal has been raised.
pub fn is_cancelled(signal: &CancelSignal) -> bool {
    *signal.borrow()
}

/// Resolve once the signal is raised. Pends forever if the sender is dropped first.
pub async fn cancelled(signal: &mut CancelSignal) {
    if signal.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}
