//! Weft Sync
//!
//! Pairwise replica reconciliation. The trie mirror keeps the merkle
//! summary in step with the store by consuming lifecycle events in
//! commit order; the sync engine compares snapshots with a peer, walks
//! the divergent subtree, and pulls the missing messages through the
//! merge engine. The transport is abstracted behind `PeerClient`.

pub mod engine;
pub mod mirror;
pub mod peer;

pub use engine::{snapshot_prefix, SyncEngine, SyncOptions, SyncStats};
pub use mirror::{SharedTrie, TrieMirror};
pub use peer::{ContactInfo, GossipContent, GossipMessage, PeerClient, NETWORK_TOPIC_PRIMARY};
