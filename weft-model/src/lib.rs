//! Weft Model
//!
//! Pure data types and traits for the Weft hub: message wire records,
//! identity events, crypto primitives, hub time, and the typed error
//! surface. Decoupled from storage engines and network stacks.

pub mod crypto;
pub mod error;
pub mod message;
pub mod proto;
pub mod time;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod factories;

// Re-exports from dependencies and submodules
pub use error::{HubError, HubResult};
pub use message::{is_remove_type, message_compare, validate_message};
pub use proto::{
    HashScheme, IdRegistryEvent, IdRegistryEventType, Message, MessageData, MessageType, Network,
    ReactionType, SignatureScheme, UserDataType,
};
pub use time::{FixedHubClock, HubClock, SystemHubClock};
pub use types::{EthAddress, Fid, Hash, PubKey, Signature, TsHash};
