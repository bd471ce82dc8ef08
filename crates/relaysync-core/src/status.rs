//! Single-writer publication of [`SyncState`] snapshots.
//!
//! The synchronizer owns the only [`StatusPublisher`]; the HTTP server and the
//! metrics emitter hold [`StatusHandle`]s. A published snapshot is an
//! `Arc<SyncState>` that is never mutated, so readers cannot observe a
//! half-applied update.

use relaysync_types::SyncState;
use std::sync::Arc;
use tokio::sync::watch;

/// Write side. Deliberately not `Clone`.
#[derive(Debug)]
pub struct StatusPublisher {
    tx: watch::Sender<Arc<SyncState>>,
}

/// Read side, cheap to clone.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<Arc<SyncState>>,
}

/// Create the channel, initialised to [`SyncState::initial`].
pub fn status_channel() -> (StatusPublisher, StatusHandle) {
    let (tx, rx) = watch::channel(Arc::new(SyncState::initial()));
    (StatusPublisher { tx }, StatusHandle { rx })
}

impl StatusPublisher {
    /// The snapshot most recently published.
    pub fn current(&self) -> Arc<SyncState> {
        Arc::clone(&self.tx.borrow())
    }

    /// Replace the published snapshot as a whole.
    pub fn publish(&self, state: SyncState) {
        self.tx.send_replace(Arc::new(state));
    }

    pub fn subscribe(&self) -> StatusHandle {
        StatusHandle { rx: self.tx.subscribe() }
    }
}

impl StatusHandle {
    pub fn snapshot(&self) -> Arc<SyncState> {
        Arc::clone(&self.rx.borrow())
    }

    /// Wait for the next publication. Returns `false` once the publisher is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
