//! Collaborator interfaces for wall-clock time and the transaction
//! publish/subscribe bus that feeds the mempool's ingest channel (§6).

use crate::types::Tx;
use tokio::sync::broadcast;

/// Source of `timestamp` values. Exists as a trait so tests can supply
/// fixed timestamps instead of depending on wall-clock time (§8's literal
/// scenarios all specify timestamps explicitly).
pub trait UtcClock: Send + Sync {
    /// Nanoseconds since the Unix epoch.
    fn now_nanos(&self) -> i64;
}

/// The real clock, backed by `chrono` (the teacher's own time dependency).
#[derive(Default)]
pub struct SystemClock;

impl UtcClock for SystemClock {
    fn now_nanos(&self) -> i64 {
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
    }
}

/// Publish/subscribe bus handed transactions that passed the excluded
/// SSZ/gossip verification layer, upstream of the mempool's ingest channel.
pub trait TxFeed: Send + Sync {
    fn publish(&self, tx: Tx);
    fn subscribe(&self) -> broadcast::Receiver<Tx>;
}

/// `tokio::sync::broadcast`-backed feed. Lagging subscribers drop old
/// messages rather than block the publisher, which is the right tradeoff
/// for a best-effort gossip-adjacent bus feeding a bounded ingest channel
/// downstream.
pub struct BroadcastTxFeed {
    sender: broadcast::Sender<Tx>,
}

impl BroadcastTxFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        BroadcastTxFeed { sender }
    }
}

impl TxFeed for BroadcastTxFeed {
    fn publish(&self, tx: Tx) {
        // No active subscribers is not an error; the bus is best-effort.
        let _ = self.sender.send(tx);
    }

    fn subscribe(&self) -> broadcast::Receiver<Tx> {
        self.sender.subscribe()
    }
}
