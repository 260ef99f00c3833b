//! Byte-key layout of the hub store.
//!
//! A single `RootPrefix` byte discriminates logical tables:
//!
//! - `IdRegistryEvent | fid`                      → current custody event
//! - `IdRegistryEvent | fid | block | log`        → superseded events (audit)
//! - `IdRegistryEventByCustody | address`         → custody secondary index
//! - `User | fid | postfix | …`                   → message rows and indices
//! - `TsHashIndex | tsHash`                       → `fid ‖ postfix` locator
//!
//! Message row key = `User | fid | postfix | tsHash`; set index key =
//! `User | fid | addsPostfix | target` → tsHash; by-signer index key =
//! `User | fid | BySigner | signer | tsHash` → empty.

use weft_model::{Fid, TsHash};

/// First key byte: logical table discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RootPrefix {
    IdRegistryEvent = 1,
    IdRegistryEventByCustody = 2,
    User = 3,
    /// Global tsHash → (fid, postfix) locator used to resolve sync-ids.
    TsHashIndex = 4,
}

/// Per-fid row discriminant following `User | fid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UserPostfix {
    // Message rows, one per store
    CastMessage = 1,
    SignerMessage = 2,
    ReactionMessage = 3,
    AmpMessage = 4,
    VerificationMessage = 5,
    UserDataMessage = 6,

    /// Relation from signer to every message it signed.
    BySigner = 7,

    // CRDT set indices: target → tsHash
    CastAdds = 8,
    CastRemoves = 9,
    SignerAdds = 10,
    SignerRemoves = 11,
    ReactionAdds = 12,
    ReactionRemoves = 13,
    AmpAdds = 14,
    AmpRemoves = 15,
    VerificationAdds = 16,
    VerificationRemoves = 17,
    UserDataAdds = 18,

    // Store-specific secondary indices
    CastsByParent = 19,
    CastsByMention = 20,
    ReactionsByTarget = 21,
}

impl UserPostfix {
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::CastMessage,
            2 => Self::SignerMessage,
            3 => Self::ReactionMessage,
            4 => Self::AmpMessage,
            5 => Self::VerificationMessage,
            6 => Self::UserDataMessage,
            7 => Self::BySigner,
            8 => Self::CastAdds,
            9 => Self::CastRemoves,
            10 => Self::SignerAdds,
            11 => Self::SignerRemoves,
            12 => Self::ReactionAdds,
            13 => Self::ReactionRemoves,
            14 => Self::AmpAdds,
            15 => Self::AmpRemoves,
            16 => Self::VerificationAdds,
            17 => Self::VerificationRemoves,
            18 => Self::UserDataAdds,
            19 => Self::CastsByParent,
            20 => Self::CastsByMention,
            21 => Self::ReactionsByTarget,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Key builders
// ---------------------------------------------------------------------------

/// `IdRegistryEvent | fid` — the current custody event for an fid.
pub fn id_registry_event_key(fid: Fid) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + Fid::KEY_LEN);
    key.push(RootPrefix::IdRegistryEvent as u8);
    key.extend_from_slice(&fid.to_key_bytes());
    key
}

/// `IdRegistryEvent | fid | block | log` — a superseded event kept for audit.
pub fn id_registry_archive_key(fid: Fid, block_number: u64, log_index: u32) -> Vec<u8> {
    let mut key = id_registry_event_key(fid);
    key.extend_from_slice(&block_number.to_be_bytes());
    key.extend_from_slice(&log_index.to_be_bytes());
    key
}

/// `IdRegistryEventByCustody | address` — event lookup by custody address.
pub fn id_registry_by_custody_key(address: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + address.len());
    key.push(RootPrefix::IdRegistryEventByCustody as u8);
    key.extend_from_slice(address);
    key
}

/// Prefix of every current custody event row.
pub fn id_registry_prefix() -> Vec<u8> {
    vec![RootPrefix::IdRegistryEvent as u8]
}

/// `User | fid` — prefix of everything stored for an fid.
pub fn user_prefix(fid: Fid) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + Fid::KEY_LEN);
    key.push(RootPrefix::User as u8);
    key.extend_from_slice(&fid.to_key_bytes());
    key
}

/// `User | fid | postfix` — prefix of one row kind for an fid.
pub fn user_key(fid: Fid, postfix: UserPostfix) -> Vec<u8> {
    let mut key = user_prefix(fid);
    key.push(postfix as u8);
    key
}

/// `User | fid | postfix | tsHash` — a message row.
pub fn message_key(fid: Fid, postfix: UserPostfix, ts_hash: &TsHash) -> Vec<u8> {
    let mut key = user_key(fid, postfix);
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

/// `User | fid | setPostfix | target` — a CRDT set index row.
pub fn set_key(fid: Fid, postfix: UserPostfix, target: &[u8]) -> Vec<u8> {
    let mut key = user_key(fid, postfix);
    key.extend_from_slice(target);
    key
}

/// `User | fid | BySigner | signer` — prefix of a signer's messages.
pub fn by_signer_prefix(fid: Fid, signer: &[u8]) -> Vec<u8> {
    let mut key = user_key(fid, UserPostfix::BySigner);
    key.extend_from_slice(signer);
    key
}

/// `User | fid | BySigner | signer | tsHash` — by-signer relation row.
pub fn by_signer_key(fid: Fid, signer: &[u8], ts_hash: &TsHash) -> Vec<u8> {
    let mut key = by_signer_prefix(fid, signer);
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

/// `TsHashIndex | tsHash` — global locator; the value is `fid ‖ postfix`.
pub fn ts_hash_index_key(ts_hash: &TsHash) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + TsHash::LEN);
    key.push(RootPrefix::TsHashIndex as u8);
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

/// Encode the `fid ‖ postfix` locator value of a tsHash index row.
pub fn ts_hash_index_value(fid: Fid, postfix: UserPostfix) -> Vec<u8> {
    let mut value = Vec::with_capacity(Fid::KEY_LEN + 1);
    value.extend_from_slice(&fid.to_key_bytes());
    value.push(postfix as u8);
    value
}

/// Decode a `fid ‖ postfix` locator value.
pub fn parse_ts_hash_index_value(value: &[u8]) -> Option<(Fid, UserPostfix)> {
    if value.len() != Fid::KEY_LEN + 1 {
        return None;
    }
    let mut fid_bytes = [0u8; Fid::KEY_LEN];
    fid_bytes.copy_from_slice(&value[..Fid::KEY_LEN]);
    let postfix = UserPostfix::from_u8(value[Fid::KEY_LEN])?;
    Some((Fid::from_key_bytes(fid_bytes), postfix))
}
