//! Weft Trie
//!
//! The order-independent replica summary: one leaf per message, keyed by
//! sync-id, with cached 16-byte BLAKE3 digests at every node. Two hubs
//! compare root hashes to decide whether to reconcile and excluded-hash
//! snapshots to find where.

pub mod sync_id;
pub mod trie;

pub use sync_id::SyncId;
pub use trie::{ChildSummary, MerkleTrie, NodeMetadata, TrieSnapshot};
