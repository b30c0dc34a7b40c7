//! Progress fan-out for a single campaign.
//!
//! Each attached observer is an unbounded channel drained by its WebSocket
//! connection task. Writes are best-effort: a closed channel is skipped and
//! never affects the other observers or the publisher. Observers receive
//! snapshots in publish order because every publish happens under the owning
//! campaign's state lock.
//!
//! Channels are unbounded. A stalled client queues one snapshot per
//! recipient outcome plus the lifecycle frames, so its backlog is bounded by
//! the recipient cap (`MAX_RECIPIENTS`) and is freed when the observer
//! detaches or the campaign is destroyed.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::mpsc;

/// Channel sender half for pushing frames to one observer.
pub type ObserverSender = mpsc::UnboundedSender<Message>;

/// Receiver half handed to the connection that attached.
pub type ObserverReceiver = mpsc::UnboundedReceiver<Message>;

/// The observers currently attached to one campaign.
#[derive(Debug, Default)]
pub struct ObserverSet {
    observers: HashMap<String, ObserverSender>,
    closed: bool,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer and return its receiver.
    ///
    /// Returns `None` once the set has been closed. Re-using an id replaces
    /// the previous observer.
    pub fn attach(&mut self, conn_id: String) -> Option<ObserverReceiver> {
        if self.closed {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.insert(conn_id, tx);
        Some(rx)
    }

    /// Remove an observer. Unknown ids are ignored.
    pub fn detach(&mut self, conn_id: &str) {
        self.observers.remove(conn_id);
    }

    /// Send a frame to a single observer, best-effort.
    pub fn send_to(&self, conn_id: &str, message: Message) {
        if let Some(tx) = self.observers.get(conn_id) {
            let _ = tx.send(message);
        }
    }

    /// Send a frame to every observer, best-effort.
    ///
    /// Returns the number of observers the frame was queued for.
    pub fn broadcast(&self, message: &Message) -> usize {
        self.observers
            .values()
            .filter(|tx| tx.send(message.clone()).is_ok())
            .count()
    }

    /// Send a Ping frame to every observer.
    pub fn ping_all(&self) {
        self.broadcast(&Message::Ping(Bytes::new()));
    }

    /// Send a Close frame to every observer, drop them all, and refuse new
    /// ones. Later broadcasts are no-ops.
    pub fn close(&mut self) -> usize {
        let count = self.observers.len();
        for tx in self.observers.values() {
            let _ = tx.send(Message::Close(None));
        }
        self.observers.clear();
        self.closed = true;
        count
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
