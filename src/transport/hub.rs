// SPDX-License-Identifier: MIT

//! Broadcast hub — fans out server-originated messages to every live peer,
//! via a per-client `mpsc` sender map keyed by peer id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};

/// Identifies a connected peer within the hub.
pub type PeerId = u64;

/// Set of live peers, each owning an unbounded outbound queue.
pub struct Hub {
    peers: RwLock<HashMap<PeerId, mpsc::UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self { peers: RwLock::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }

    /// Register a new peer and return its id plus the receiving half of its
    /// outbound queue.
    pub async fn register(&self) -> (PeerId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.write().await.insert(id, tx);
        (id, rx)
    }

    pub async fn unregister(&self, id: PeerId) {
        self.peers.write().await.remove(&id);
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Send `payload` to every peer currently registered at the moment of
    /// emission. Delivery is best-effort per peer: a dead queue is logged
    /// and does not affect siblings. The membership map is snapshotted
    /// under the lock and iterated outside it so a slow or wedged peer
    /// write can never hold the hub lock.
    pub async fn broadcast(&self, payload: String) {
        let snapshot: Vec<(PeerId, mpsc::UnboundedSender<String>)> = {
            let peers = self.peers.read().await;
            peers.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };
        for (id, tx) in snapshot {
            if tx.send(payload.clone()).is_err() {
                tracing::debug!(peer_id = id, "broadcast dropped: peer queue closed");
            }
        }
    }

    /// Send `payload` to a single peer (used for direct command replies).
    pub async fn send_to(&self, id: PeerId, payload: String) {
        let tx = { self.peers.read().await.get(&id).cloned() };
        if let Some(tx) = tx {
            if tx.send(payload).is_err() {
                tracing::debug!(peer_id = id, "unicast dropped: peer queue closed");
            }
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_registered_peer() {
        let hub = Hub::new();
        let (_id1, mut rx1) = hub.register().await;
        let (_id2, mut rx2) = hub.register().await;

        hub.broadcast("hello".to_owned()).await;

        assert_eq!(rx1.recv().await, Some("hello".to_owned()));
        assert_eq!(rx2.recv().await, Some("hello".to_owned()));
    }

    #[tokio::test]
    async fn late_joiner_does_not_see_past_broadcasts() {
        let hub = Hub::new();
        let (_id1, mut rx1) = hub.register().await;
        hub.broadcast("before".to_owned()).await;
        let (_id2, mut rx2) = hub.register().await;
        hub.broadcast("after".to_owned()).await;

        assert_eq!(rx1.recv().await, Some("before".to_owned()));
        assert_eq!(rx1.recv().await, Some("after".to_owned()));
        assert_eq!(rx2.recv().await, Some("after".to_owned()));
    }

    #[tokio::test]
    async fn unregistered_peer_is_skipped() {
        let hub = Hub::new();
        let (id1, rx1) = hub.register().await;
        drop(rx1);
        hub.unregister(id1).await;
        assert_eq!(hub.peer_count().await, 0);
        // Should not panic even though no peers remain.
        hub.broadcast("noop".to_owned()).await;
    }
}
