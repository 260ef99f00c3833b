//! Strong types for byte arrays
//!
//! Semantic newtypes for the fixed-size byte strings of the hub data model,
//! replacing raw `[u8; N]`.

use std::fmt;

use crate::error::{HubError, HubResult};

/// Macro to define fixed-size byte arrays with strong types.
///
/// Args:
/// - $name: The name of the struct (e.g., Hash)
/// - $len: The size of the array (e.g., 16)
/// - $doc: Documentation string
/// - $derives: List of traits to derive
macro_rules! define_bytes {
    ($name:ident, $len:expr, $doc:expr, [$($derives:ident),*]) => {
        #[doc = $doc]
        #[derive(Clone, Copy, serde::Serialize, serde::Deserialize, $($derives),*)]
        #[repr(transparent)]
        pub struct $name(#[serde(with = "serde_bytes")] pub [u8; $len]);

        impl $name {
            /// Returns the inner bytes as a slice.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Parse from a hex string.
            pub fn from_hex(hex_str: &str) -> HubResult<Self> {
                let bytes = hex::decode(hex_str)
                    .map_err(|e| HubError::invalid_param(format!("invalid hex: {}", e)))?;
                Self::try_from(bytes.as_slice()).map_err(|_| {
                    HubError::invalid_param(format!(
                        "expected {} hex characters, got {}",
                        $len * 2,
                        hex_str.len()
                    ))
                })
            }
        }

        // Standard conversions
        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl From<$name> for [u8; $len] {
            fn from(wrapper: $name) -> [u8; $len] {
                wrapper.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = [u8; $len];
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        // Zero-allocation hex formatting
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(self, f)
            }
        }

        impl fmt::LowerHex for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for byte in &self.0 {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(", stringify!($name))?;
                fmt::Display::fmt(self, f)?;
                write!(f, ")")
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;
            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                Ok(Self(<[u8; $len]>::try_from(slice)?))
            }
        }

        impl TryFrom<Vec<u8>> for $name {
            type Error = Vec<u8>;
            fn try_from(vec: Vec<u8>) -> Result<Self, Self::Error> {
                if vec.len() != $len {
                    return Err(vec);
                }
                let mut arr = [0u8; $len];
                arr.copy_from_slice(&vec);
                Ok(Self(arr))
            }
        }
    };
}

// --- Type Definitions ---

define_bytes!(
    Hash,
    16,
    "16-byte content hash (BLAKE3, dkLen = 16)",
    [PartialEq, Eq, Hash, Default, PartialOrd, Ord]
);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 16]);
}

define_bytes!(
    PubKey,
    32,
    "32-byte Ed25519 public key (delegate signer)",
    [PartialEq, Eq, Hash, Default, PartialOrd, Ord]
);

define_bytes!(
    EthAddress,
    20,
    "20-byte Ethereum address (custody)",
    [PartialEq, Eq, Hash, Default, PartialOrd, Ord]
);

define_bytes!(
    Signature,
    64,
    "64-byte Ed25519 signature",
    [PartialEq, Eq]
);

/// User identifier anchored on-chain.
///
/// Encoded as 8-byte big-endian in KV keys so fid-scoped prefixes stay
/// fixed-width and sort numerically.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
pub struct Fid(pub u64);

impl Fid {
    pub const KEY_LEN: usize = 8;

    /// Big-endian key encoding.
    pub fn to_key_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_key_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl From<u64> for Fid {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Total-orderable message identity: 4-byte big-endian hub timestamp
/// followed by the 16-byte BLAKE3 message hash.
///
/// Byte order equals chronological order with a deterministic hash tiebreak.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TsHash([u8; 20]);

impl TsHash {
    pub const LEN: usize = 20;

    pub fn new(timestamp: u32, hash: &Hash) -> Self {
        let mut bytes = [0u8; 20];
        bytes[..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..].copy_from_slice(hash.as_bytes());
        Self(bytes)
    }

    pub fn timestamp(&self) -> u32 {
        let mut ts = [0u8; 4];
        ts.copy_from_slice(&self.0[..4]);
        u32::from_be_bytes(ts)
    }

    pub fn hash(&self) -> Hash {
        let mut h = [0u8; 16];
        h.copy_from_slice(&self.0[4..]);
        Hash(h)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl From<[u8; 20]> for TsHash {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for TsHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for TsHash {
    type Error = std::array::TryFromSliceError;
    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(<[u8; 20]>::try_from(slice)?))
    }
}

impl fmt::Display for TsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TsHash({})", self)
    }
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_display() {
        let hash = Hash([0xab; 16]);
        let expected = "ab".repeat(16);
        assert_eq!(format!("{}", hash), expected);
        assert_eq!(format!("{:?}", hash), format!("Hash({})", expected));
    }

    #[test]
    fn test_from_into() {
        let bytes: [u8; 16] = [1; 16];
        let hash: Hash = bytes.into();
        let back: [u8; 16] = hash.into();
        assert_eq!(bytes, back);
        assert_eq!(*hash, bytes); // Deref
    }

    #[test]
    fn test_from_hex_rejects_bad_length() {
        assert!(Hash::from_hex("abcd").is_err());
        let ok = Hash::from_hex(&"ab".repeat(16)).unwrap();
        assert_eq!(ok, Hash([0xab; 16]));
    }

    #[test]
    fn test_ts_hash_roundtrip() {
        let hash = Hash([7u8; 16]);
        let ts_hash = TsHash::new(1_665_182_332, &hash);
        assert_eq!(ts_hash.timestamp(), 1_665_182_332);
        assert_eq!(ts_hash.hash(), hash);
    }

    #[test]
    fn test_ts_hash_orders_chronologically() {
        let a = TsHash::new(100, &Hash([0xff; 16]));
        let b = TsHash::new(101, &Hash([0x00; 16]));
        assert!(a < b);

        // Same timestamp: hash bytes break the tie
        let c = TsHash::new(100, &Hash([0x01; 16]));
        let d = TsHash::new(100, &Hash([0x02; 16]));
        assert!(c < d);
    }

    #[test]
    fn test_fid_key_bytes_sort_numerically() {
        let a = Fid(256).to_key_bytes();
        let b = Fid(257).to_key_bytes();
        let c = Fid(65536).to_key_bytes();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(Fid::from_key_bytes(a), Fid(256));
    }
}
