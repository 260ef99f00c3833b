//! Trie mirror: the single writer of the replica summary.
//!
//! Subscribes to the event bus and replays merge/prune/revoke events
//! into the merkle trie in commit order. Once the queue is drained, the
//! trie root reflects the KV state exactly.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::RwLock;

use weft_store::{EventBus, HubEvent};
use weft_trie::{MerkleTrie, SyncId};

/// The trie handle shared between the mirror (writer) and the sync
/// engine (reader).
pub type SharedTrie = Arc<RwLock<MerkleTrie>>;

pub struct TrieMirror {
    trie: SharedTrie,
    rx: broadcast::Receiver<HubEvent>,
}

impl TrieMirror {
    /// Subscribe to the bus. Events emitted before this call are not
    /// observed; construct the mirror before merging anything.
    pub fn new(trie: SharedTrie, events: &EventBus) -> Self {
        Self {
            trie,
            rx: events.subscribe(),
        }
    }

    /// Apply one lifecycle event to the trie.
    pub async fn apply(trie: &SharedTrie, event: &HubEvent) {
        match event {
            HubEvent::MergeMessage(msg) => match SyncId::from_message(msg) {
                Ok(id) => {
                    trie.write().await.insert(&id);
                }
                Err(e) => tracing::warn!(error = %e, "merged message has no sync-id"),
            },
            HubEvent::PruneMessage(msg) | HubEvent::RevokeMessage(msg) => {
                match SyncId::from_message(msg) {
                    Ok(id) => {
                        trie.write().await.delete(&id);
                    }
                    Err(e) => tracing::warn!(error = %e, "deleted message has no sync-id"),
                }
            }
            HubEvent::MergeIdRegistryEvent(_) | HubEvent::SyncComplete { .. } => {}
        }
    }

    /// Apply everything currently queued, then return.
    pub async fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => Self::apply(&self.trie, &event).await,
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "trie mirror lagged behind the event bus");
                }
                Err(_) => break,
            }
        }
    }

    /// Consume events until the bus closes.
    pub async fn run(mut self) {
        loop {
            match self.rx.recv().await {
                Ok(event) => Self::apply(&self.trie, &event).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "trie mirror lagged behind the event bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
