//! Wire types for the hub
//!
//! Hand-derived prost messages rather than `build.rs` codegen, so the
//! workspace builds without a system `protoc`. Encoding is deterministic
//! per message, which the content-hash contract relies on.

/// A signed record submitted on behalf of an fid.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Message {
    #[prost(message, optional, tag = "1")]
    pub data: Option<MessageData>,
    /// BLAKE3 digest of the encoded `data`.
    #[prost(bytes = "vec", tag = "2")]
    pub hash: Vec<u8>,
    #[prost(enumeration = "HashScheme", tag = "3")]
    pub hash_scheme: i32,
    #[prost(bytes = "vec", tag = "4")]
    pub signature: Vec<u8>,
    #[prost(enumeration = "SignatureScheme", tag = "5")]
    pub signature_scheme: i32,
    /// Ed25519 public key for delegate messages; custody address for
    /// Signer messages.
    #[prost(bytes = "vec", tag = "6")]
    pub signer: Vec<u8>,
}

/// The hashed and signed payload of a [`Message`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct MessageData {
    #[prost(uint64, tag = "1")]
    pub fid: u64,
    /// Hub time, seconds since the network epoch.
    #[prost(fixed32, tag = "2")]
    pub timestamp: u32,
    #[prost(enumeration = "Network", tag = "3")]
    pub network: i32,
    #[prost(enumeration = "MessageType", tag = "4")]
    pub msg_type: i32,
    #[prost(
        oneof = "Body",
        tags = "5, 6, 7, 8, 9, 10, 11, 12"
    )]
    pub body: Option<Body>,
}

/// Type-specific payload.
#[derive(Clone, PartialEq, prost::Oneof)]
pub enum Body {
    #[prost(message, tag = "5")]
    CastAdd(CastAddBody),
    #[prost(message, tag = "6")]
    CastRemove(CastRemoveBody),
    #[prost(message, tag = "7")]
    Reaction(ReactionBody),
    #[prost(message, tag = "8")]
    Amp(AmpBody),
    #[prost(message, tag = "9")]
    VerificationAdd(VerificationAddBody),
    #[prost(message, tag = "10")]
    VerificationRemove(VerificationRemoveBody),
    #[prost(message, tag = "11")]
    Signer(SignerBody),
    #[prost(message, tag = "12")]
    UserData(UserDataBody),
}

/// Reference to a cast by author and identity.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CastId {
    #[prost(uint64, tag = "1")]
    pub fid: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub ts_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CastAddBody {
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(uint64, repeated, tag = "2")]
    pub mentions: Vec<u64>,
    #[prost(message, optional, tag = "3")]
    pub parent: Option<CastId>,
    #[prost(string, repeated, tag = "4")]
    pub embeds: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CastRemoveBody {
    /// tsHash of the CastAdd being removed.
    #[prost(bytes = "vec", tag = "1")]
    pub target_ts_hash: Vec<u8>,
}

/// Shared by ReactionAdd and ReactionRemove; the message type carries the
/// polarity.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ReactionBody {
    #[prost(enumeration = "ReactionType", tag = "1")]
    pub reaction_type: i32,
    #[prost(message, optional, tag = "2")]
    pub target: Option<CastId>,
}

/// Shared by AmpAdd and AmpRemove.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AmpBody {
    #[prost(uint64, tag = "1")]
    pub target_fid: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct VerificationAddBody {
    #[prost(bytes = "vec", tag = "1")]
    pub address: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub claim_signature: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub block_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct VerificationRemoveBody {
    #[prost(bytes = "vec", tag = "1")]
    pub address: Vec<u8>,
}

/// Shared by SignerAdd and SignerRemove.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SignerBody {
    /// Ed25519 public key being authorized or revoked.
    #[prost(bytes = "vec", tag = "1")]
    pub signer: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UserDataBody {
    #[prost(enumeration = "UserDataType", tag = "1")]
    pub data_type: i32,
    #[prost(string, tag = "2")]
    pub value: String,
}

/// On-chain identity event establishing or transferring custody of an fid.
#[derive(Clone, PartialEq, prost::Message)]
pub struct IdRegistryEvent {
    #[prost(enumeration = "IdRegistryEventType", tag = "1")]
    pub event_type: i32,
    #[prost(uint64, tag = "2")]
    pub block_number: u64,
    #[prost(uint32, tag = "3")]
    pub log_index: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub block_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub transaction_hash: Vec<u8>,
    #[prost(uint64, tag = "6")]
    pub fid: u64,
    /// Previous custody address; empty for Register.
    #[prost(bytes = "vec", tag = "7")]
    pub from: Vec<u8>,
    /// New custody address.
    #[prost(bytes = "vec", tag = "8")]
    pub to: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MessageType {
    None = 0,
    CastAdd = 1,
    CastRemove = 2,
    ReactionAdd = 3,
    ReactionRemove = 4,
    AmpAdd = 5,
    AmpRemove = 6,
    VerificationAddEthAddress = 7,
    VerificationRemove = 8,
    SignerAdd = 9,
    SignerRemove = 10,
    UserDataAdd = 11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Network {
    None = 0,
    Mainnet = 1,
    Testnet = 2,
    Devnet = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum HashScheme {
    None = 0,
    Blake3 = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SignatureScheme {
    None = 0,
    /// Delegate-signer Ed25519 signature over the message hash.
    Ed25519 = 1,
    /// Custody-address recoverable secp256k1 signature.
    Eip712 = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ReactionType {
    None = 0,
    Like = 1,
    Recast = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum UserDataType {
    None = 0,
    Pfp = 1,
    Display = 2,
    Bio = 3,
    Location = 4,
    Url = 5,
    Fname = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum IdRegistryEventType {
    None = 0,
    Register = 1,
    Transfer = 2,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;

    #[test]
    fn test_message_roundtrip() {
        let msg = Message {
            data: Some(MessageData {
                fid: 42,
                timestamp: 1_665_182_332,
                network: Network::Devnet as i32,
                msg_type: MessageType::CastAdd as i32,
                body: Some(Body::CastAdd(CastAddBody {
                    text: "hello weft".to_string(),
                    mentions: vec![7],
                    parent: None,
                    embeds: vec![],
                })),
            }),
            hash: vec![1u8; 16],
            hash_scheme: HashScheme::Blake3 as i32,
            signature: vec![0u8; 64],
            signature_scheme: SignatureScheme::Ed25519 as i32,
            signer: vec![2u8; 32],
        };

        let buf = msg.encode_to_vec();
        let decoded = Message::decode(buf.as_slice()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_data_encoding_is_deterministic() {
        let data = MessageData {
            fid: 1,
            timestamp: 100,
            network: Network::Devnet as i32,
            msg_type: MessageType::AmpAdd as i32,
            body: Some(Body::Amp(AmpBody { target_fid: 2 })),
        };
        assert_eq!(data.encode_to_vec(), data.clone().encode_to_vec());
    }

    #[test]
    fn test_id_registry_event_roundtrip() {
        let event = IdRegistryEvent {
            event_type: IdRegistryEventType::Register as i32,
            block_number: 10,
            log_index: 0,
            block_hash: vec![3u8; 32],
            transaction_hash: vec![4u8; 32],
            fid: 42,
            from: vec![],
            to: vec![5u8; 20],
        };
        let buf = event.encode_to_vec();
        assert_eq!(IdRegistryEvent::decode(buf.as_slice()).unwrap(), event);
    }
}
