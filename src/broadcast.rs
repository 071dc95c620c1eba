//! Fan-out of engine snapshots to independent observers.
//!
//! Each observer (floating display, menu bar summary, settings window, socket
//! watchers) holds its own receiver of value copies. The channel is bounded
//! and drops the oldest snapshot for a receiver that falls behind, so a slow
//! or vanished observer can never block the engine.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace};

use crate::types::EngineSnapshot;

/// Default per-subscriber backlog.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Receiver handed to observers.
pub type SnapshotReceiver = broadcast::Receiver<EngineSnapshot>;

/// Publishes snapshots to every current subscriber.
#[derive(Debug, Clone)]
pub struct StateBroadcaster {
    tx: broadcast::Sender<EngineSnapshot>,
}

impl Default for StateBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl StateBroadcaster {
    /// Creates a broadcaster keeping at most `capacity` unread snapshots per
    /// subscriber (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Registers a new observer. It sees snapshots published from now on.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }

    /// Sends a copy of `snapshot` to every subscriber.
    ///
    /// Returns the number of subscribers reached. Never blocks.
    pub fn publish(&self, snapshot: EngineSnapshot) -> usize {
        match self.tx.send(snapshot) {
            Ok(count) => {
                trace!(subscribers = count, "スナップショットを配信しました");
                count
            }
            // No subscribers right now; nothing to deliver.
            Err(_) => 0,
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Waits for the next snapshot, skipping over any that were dropped because
/// this receiver lagged. Returns `None` once the broadcaster is gone.
pub async fn next_snapshot(rx: &mut SnapshotReceiver) -> Option<EngineSnapshot> {
    loop {
        match rx.recv().await {
            Ok(snapshot) => return Some(snapshot),
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "遅延した購読者の古いスナップショットを破棄しました");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
