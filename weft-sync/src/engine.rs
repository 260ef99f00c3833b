//! The sync engine: snapshot exchange and divergence-driven pull.
//!
//! One reconciliation is a single logical task: fetch the peer's
//! snapshot at the current-time prefix, derive the divergence prefix
//! against the local trie, walk the differing subtree breadth-first
//! comparing child hashes, and pull missing sync-ids at the leaves. Each
//! fetched message goes through the merge engine; a bad message is
//! recorded and skipped, never fatal to the walk. The whole run is
//! bounded by a timeout and always ends with a `SyncComplete` event.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use weft_model::{HubClock, HubError, HubResult, SystemHubClock};
use weft_store::{Engine, EventBus, HubEvent};
use weft_trie::SyncId;

use crate::mirror::SharedTrie;
use crate::peer::{GossipContent, GossipMessage, PeerClient};

/// Reconciliation bounds.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Bound on one full reconciliation.
    pub timeout: Duration,
    /// Subtrees at or below this many messages are pulled whole instead
    /// of walked further.
    pub fetch_threshold: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            fetch_threshold: 128,
        }
    }
}

/// Outcome counters for one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Messages fetched from the peer.
    pub fetched: usize,
    /// Messages that merged successfully.
    pub merged: usize,
}

/// The 10-digit snapshot prefix for a point in hub time, truncated to
/// the decade so both sides of an exchange agree on the anchor.
pub fn snapshot_prefix(hub_time: u32) -> Vec<u8> {
    format!("{:010}", hub_time - (hub_time % 10)).into_bytes()
}

pub struct SyncEngine {
    engine: Arc<Engine>,
    trie: SharedTrie,
    events: EventBus,
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(engine: Arc<Engine>, trie: SharedTrie, events: EventBus) -> Self {
        Self::with_options(engine, trie, events, SyncOptions::default())
    }

    pub fn with_options(
        engine: Arc<Engine>,
        trie: SharedTrie,
        events: EventBus,
        options: SyncOptions,
    ) -> Self {
        Self {
            engine,
            trie,
            events,
            options,
        }
    }

    /// Reconcile with one peer. Emits `SyncComplete(success)` whether the
    /// run finishes, fails, or times out.
    #[tracing::instrument(skip_all)]
    pub async fn sync_with_peer(&self, peer: &dyn PeerClient) -> HubResult<SyncStats> {
        let outcome = tokio::time::timeout(self.options.timeout, self.reconcile(peer)).await;
        let result = match outcome {
            Ok(Ok(stats)) => {
                tracing::info!(fetched = stats.fetched, merged = stats.merged, "sync complete");
                Ok(stats)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "sync failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!("sync abandoned: reconciliation timed out");
                Err(HubError::unavailable("reconciliation timed out"))
            }
        };
        self.events.emit(HubEvent::SyncComplete {
            success: result.is_ok(),
        });
        result
    }

    async fn reconcile(&self, peer: &dyn PeerClient) -> HubResult<SyncStats> {
        let now = SystemHubClock.now()?;
        let prefix = snapshot_prefix(now);

        let their_snapshot = peer.get_snapshot(&prefix).await?;
        let divergence = {
            let trie = self.trie.read().await;
            trie.divergence_prefix(&prefix, &their_snapshot.excluded_hashes)
        };
        tracing::debug!(
            divergence = %String::from_utf8_lossy(&divergence),
            "starting divergence walk"
        );

        let mut stats = SyncStats::default();
        let mut queue = VecDeque::from([divergence]);
        while let Some(node_prefix) = queue.pop_front() {
            let Some(theirs) = peer.get_node_metadata(&node_prefix).await? else {
                continue;
            };
            let ours = self.trie.read().await.node_metadata(&node_prefix);
            if let Some(ours) = &ours {
                if ours.hash == theirs.hash {
                    continue;
                }
            }

            if theirs.children.is_empty() || theirs.num_messages <= self.options.fetch_threshold {
                self.pull_prefix(peer, &node_prefix, &mut stats).await?;
            } else {
                for child in &theirs.children {
                    let local_child_hash = ours.as_ref().and_then(|o| {
                        o.children
                            .iter()
                            .find(|c| c.digit == child.digit)
                            .map(|c| c.hash)
                    });
                    if local_child_hash != Some(child.hash) {
                        let mut child_prefix = node_prefix.clone();
                        child_prefix.push(child.digit);
                        queue.push_back(child_prefix);
                    }
                }
            }
        }
        Ok(stats)
    }

    /// Fetch every sync-id the peer holds under a prefix and merge the
    /// ones this replica is missing.
    async fn pull_prefix(
        &self,
        peer: &dyn PeerClient,
        prefix: &[u8],
        stats: &mut SyncStats,
    ) -> HubResult<()> {
        let their_ids = peer.get_sync_ids_by_prefix(prefix).await?;
        let missing: Vec<Vec<u8>> = {
            let trie = self.trie.read().await;
            their_ids
                .into_iter()
                .filter(|raw| match SyncId::from_bytes(raw.clone()) {
                    Ok(id) => !trie.exists(&id),
                    Err(e) => {
                        tracing::debug!(error = %e, "peer sent a malformed sync-id");
                        false
                    }
                })
                .collect()
        };
        if missing.is_empty() {
            return Ok(());
        }

        let messages = peer.get_messages_by_sync_ids(missing).await?;
        stats.fetched += messages.len();
        for msg in messages {
            match self.engine.merge_message(&msg) {
                Ok(()) => stats.merged += 1,
                Err(e) if e.is_bad_request() => {
                    tracing::debug!(error = %e, "rejected message from peer");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not merge message from peer");
                }
            }
        }
        Ok(())
    }

    /// Ingest one gossip delivery. Bad payloads are recorded and dropped;
    /// gossip never aborts on a single bad message. ContactInfo is the
    /// caller's cue to resolve a `PeerClient` and call `sync_with_peer`.
    pub fn handle_gossip(&self, gossip: &GossipMessage) {
        match &gossip.content {
            GossipContent::Message(msg) => {
                if let Err(e) = self.engine.merge_message(msg) {
                    tracing::debug!(error = %e, "dropped gossiped message");
                }
            }
            GossipContent::IdRegistryEvent(event) => {
                if let Err(e) = self.engine.merge_id_registry_event(event) {
                    tracing::debug!(error = %e, "dropped gossiped identity event");
                }
            }
            GossipContent::ContactInfo(contact) => {
                tracing::debug!(peer = %hex_id(&contact.peer_id), "contact info received");
            }
        }
    }
}

fn hex_id(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
