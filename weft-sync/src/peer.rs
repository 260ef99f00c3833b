//! The transport seam of the sync engine.
//!
//! Gossip delivery and the RPC surface live outside the core; the sync
//! engine only needs a peer it can query for snapshots, node metadata,
//! and messages. Transport failures surface as `unavailable`.

use weft_model::{HubResult, IdRegistryEvent, Message};
use weft_trie::{NodeMetadata, TrieSnapshot};

/// The primary gossip topic carrying hub traffic.
pub const NETWORK_TOPIC_PRIMARY: &str = "weft/primary/0.3";

/// A peer's advertisement of its reachable RPC endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactInfo {
    pub peer_id: Vec<u8>,
    pub rpc_address: Option<String>,
}

/// Payload of one gossip delivery.
#[derive(Clone, Debug)]
pub enum GossipContent {
    Message(Message),
    IdRegistryEvent(IdRegistryEvent),
    ContactInfo(ContactInfo),
}

#[derive(Clone, Debug)]
pub struct GossipMessage {
    pub content: GossipContent,
    pub topics: Vec<String>,
}

/// Read-side of a remote hub, as the sync engine consumes it.
///
/// Implementations wrap whatever transport reaches the peer (RPC client,
/// in-process handle in tests) and classify failures: network errors are
/// `unavailable` and retryable, protocol mismatches are terminal.
#[async_trait::async_trait]
pub trait PeerClient: Send + Sync {
    /// The peer's excluded-hash snapshot at a prefix.
    async fn get_snapshot(&self, prefix: &[u8]) -> HubResult<TrieSnapshot>;

    /// Metadata of the peer's trie node at a prefix, if present.
    async fn get_node_metadata(&self, prefix: &[u8]) -> HubResult<Option<NodeMetadata>>;

    /// All sync-ids under a prefix on the peer.
    async fn get_sync_ids_by_prefix(&self, prefix: &[u8]) -> HubResult<Vec<Vec<u8>>>;

    /// The messages behind a batch of sync-ids.
    async fn get_messages_by_sync_ids(&self, sync_ids: Vec<Vec<u8>>) -> HubResult<Vec<Message>>;
}
