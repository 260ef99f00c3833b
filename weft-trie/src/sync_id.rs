//! Sync-id: the trie key of one message.
//!
//! Ten zero-padded decimal digits of the message's hub timestamp followed
//! by the forty hex digits of its tsHash. Every byte is an ASCII hex
//! digit, so the id doubles as a path through the 16-ary trie, and the
//! timestamp prefix clusters leaves chronologically.

use std::fmt;

use weft_model::{HubError, HubResult, Message, TsHash};

/// Digits in the decimal timestamp prefix.
pub const TIMESTAMP_DIGITS: usize = 10;

/// Total sync-id length: timestamp digits plus hex-encoded tsHash.
pub const SYNC_ID_LEN: usize = TIMESTAMP_DIGITS + 2 * TsHash::LEN;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyncId(Vec<u8>);

impl SyncId {
    pub fn new(timestamp: u32, ts_hash: &TsHash) -> Self {
        let mut bytes = format!("{:010}", timestamp).into_bytes();
        bytes.extend_from_slice(hex::encode(ts_hash.as_bytes()).as_bytes());
        Self(bytes)
    }

    pub fn from_message(msg: &Message) -> HubResult<Self> {
        Ok(Self::new(msg.timestamp(), &msg.ts_hash()?))
    }

    /// Parse and validate raw sync-id bytes (e.g. received from a peer).
    pub fn from_bytes(bytes: Vec<u8>) -> HubResult<Self> {
        if bytes.len() != SYNC_ID_LEN {
            return Err(HubError::parse(format!(
                "sync-id must be {} bytes, got {}",
                SYNC_ID_LEN,
                bytes.len()
            )));
        }
        if !bytes[..TIMESTAMP_DIGITS].iter().all(u8::is_ascii_digit) {
            return Err(HubError::parse("sync-id timestamp is not decimal"));
        }
        if !bytes[TIMESTAMP_DIGITS..]
            .iter()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b))
        {
            return Err(HubError::parse("sync-id hash is not lowercase hex"));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The hub timestamp prefix.
    pub fn timestamp(&self) -> HubResult<u32> {
        std::str::from_utf8(&self.0[..TIMESTAMP_DIGITS])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| HubError::parse("sync-id timestamp is not decimal"))
    }

    /// The message identity carried in the suffix.
    pub fn ts_hash(&self) -> HubResult<TsHash> {
        let raw = hex::decode(&self.0[TIMESTAMP_DIGITS..])
            .map_err(|e| HubError::parse(format!("sync-id hash: {}", e)))?;
        TsHash::try_from(raw.as_slice()).map_err(|_| HubError::parse("sync-id hash length"))
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncId({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_model::Hash;

    #[test]
    fn test_shape() {
        let ts_hash = TsHash::new(1_665_182_332, &Hash([0xab; 16]));
        let id = SyncId::new(1_665_182_332, &ts_hash);
        assert_eq!(id.as_bytes().len(), SYNC_ID_LEN);
        assert!(id.as_bytes().starts_with(b"1665182332"));
    }

    #[test]
    fn test_small_timestamps_are_zero_padded() {
        let ts_hash = TsHash::new(42, &Hash([1; 16]));
        let id = SyncId::new(42, &ts_hash);
        assert!(id.as_bytes().starts_with(b"0000000042"));
    }

    #[test]
    fn test_roundtrip() {
        let ts_hash = TsHash::new(77, &Hash([9; 16]));
        let id = SyncId::new(77, &ts_hash);
        assert_eq!(id.timestamp().unwrap(), 77);
        assert_eq!(id.ts_hash().unwrap(), ts_hash);

        let parsed = SyncId::from_bytes(id.as_bytes().to_vec()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_from_bytes_rejects_malformed() {
        assert!(SyncId::from_bytes(vec![b'1'; 3]).is_err());
        let mut bad = SyncId::new(1, &TsHash::new(1, &Hash([0; 16])))
            .as_bytes()
            .to_vec();
        bad[0] = b'x';
        assert!(SyncId::from_bytes(bad).is_err());
    }
}
