//! Message identity, validation, and conflict ordering.
//!
//! A message's identity is its tsHash (timestamp ‖ blake3 of the encoded
//! data). Validation checks the hash binding and the signature for the
//! scheme the message type requires. The comparator here is the single
//! source of truth for CRDT conflict resolution.

use std::cmp::Ordering;

use prost::Message as _;

use crate::crypto;
use crate::error::{HubError, HubResult};
use crate::proto::{
    Body, HashScheme, Message, MessageData, MessageType, ReactionType, SignatureScheme,
    UserDataType,
};
use crate::types::{EthAddress, Fid, Hash, PubKey, Signature, TsHash};

impl Message {
    /// The signed payload; absent data is a parse failure.
    pub fn data(&self) -> HubResult<&MessageData> {
        self.data
            .as_ref()
            .ok_or_else(|| HubError::parse("message has no data"))
    }

    pub fn fid(&self) -> Fid {
        Fid(self.data.as_ref().map(|d| d.fid).unwrap_or_default())
    }

    pub fn timestamp(&self) -> u32 {
        self.data.as_ref().map(|d| d.timestamp).unwrap_or_default()
    }

    /// The declared type, or `None` for absent/unknown values.
    pub fn msg_type(&self) -> MessageType {
        self.data
            .as_ref()
            .and_then(|d| MessageType::try_from(d.msg_type).ok())
            .unwrap_or(MessageType::None)
    }

    pub fn body(&self) -> Option<&Body> {
        self.data.as_ref().and_then(|d| d.body.as_ref())
    }

    pub fn hash16(&self) -> HubResult<Hash> {
        Hash::try_from(self.hash.as_slice())
            .map_err(|_| HubError::parse(format!("message hash has {} bytes", self.hash.len())))
    }

    pub fn ts_hash(&self) -> HubResult<TsHash> {
        Ok(TsHash::new(self.timestamp(), &self.hash16()?))
    }

    pub fn is_remove(&self) -> bool {
        is_remove_type(self.msg_type())
    }
}

/// Remove-polarity message types.
pub fn is_remove_type(msg_type: MessageType) -> bool {
    matches!(
        msg_type,
        MessageType::CastRemove
            | MessageType::ReactionRemove
            | MessageType::AmpRemove
            | MessageType::VerificationRemove
            | MessageType::SignerRemove
    )
}

/// Custody-signed message types (signed by the fid's custody address
/// rather than a delegate signer).
pub fn is_signer_type(msg_type: MessageType) -> bool {
    matches!(msg_type, MessageType::SignerAdd | MessageType::SignerRemove)
}

/// Total conflict order over messages sharing a target.
///
/// Higher timestamp wins; at equal timestamps a Remove beats an Add; at
/// equal timestamp and polarity the bytewise-greater hash wins. The
/// result is deterministic across any permutation of submissions.
pub fn message_compare(a: &Message, b: &Message) -> Ordering {
    let polarity = |m: &Message| u8::from(m.is_remove());
    a.timestamp()
        .cmp(&b.timestamp())
        .then_with(|| polarity(a).cmp(&polarity(b)))
        .then_with(|| a.hash.cmp(&b.hash))
}

/// Validate a message: hash binding, signature, and body/type consistency.
///
/// Does not consult any store; signer-chain checks belong to the engine.
pub fn validate_message(msg: &Message) -> HubResult<()> {
    let data = msg.data()?;

    let msg_type = MessageType::try_from(data.msg_type)
        .map_err(|_| HubError::invalid_param(format!("unknown message type {}", data.msg_type)))?;
    if msg_type == MessageType::None {
        return Err(HubError::validation("unknown message type"));
    }

    // Hash binding
    if msg.hash_scheme != HashScheme::Blake3 as i32 {
        return Err(HubError::validation("unsupported hash scheme"));
    }
    let hash = msg.hash16()?;
    if hash != crypto::blake3_16(&data.encode_to_vec()) {
        return Err(HubError::validation("hash does not match data"));
    }

    validate_body(msg_type, data)?;

    // Signature: Signer messages carry a custody-address signature, all
    // other types a delegate Ed25519 signature.
    if is_signer_type(msg_type) {
        if msg.signature_scheme != SignatureScheme::Eip712 as i32 {
            return Err(HubError::validation(
                "signer message requires a custody signature",
            ));
        }
        let address = EthAddress::try_from(msg.signer.as_slice())
            .map_err(|_| HubError::validation("custody signer must be a 20-byte address"))?;
        crypto::verify_hash_eth(&address, &hash, &msg.signature)
            .map_err(|e| HubError::validation(e.to_string()))?;
    } else {
        if msg.signature_scheme != SignatureScheme::Ed25519 as i32 {
            return Err(HubError::validation("unsupported signature scheme"));
        }
        let pubkey = PubKey::try_from(msg.signer.as_slice())
            .map_err(|_| HubError::validation("signer must be a 32-byte Ed25519 key"))?;
        let signature = Signature::try_from(msg.signature.as_slice())
            .map_err(|_| HubError::validation("signature must be 64 bytes"))?;
        crypto::verify_hash(&pubkey, &hash, &signature)
            .map_err(|e| HubError::validation(e.to_string()))?;
    }

    Ok(())
}

fn validate_body(msg_type: MessageType, data: &MessageData) -> HubResult<()> {
    let mismatch = || HubError::validation(format!("body does not match type {:?}", msg_type));
    match (msg_type, &data.body) {
        (MessageType::CastAdd, Some(Body::CastAdd(_))) => Ok(()),
        (MessageType::CastRemove, Some(Body::CastRemove(body))) => {
            if body.target_ts_hash.len() != TsHash::LEN {
                return Err(HubError::validation("cast remove target must be a tsHash"));
            }
            Ok(())
        }
        (MessageType::ReactionAdd | MessageType::ReactionRemove, Some(Body::Reaction(body))) => {
            ReactionType::try_from(body.reaction_type)
                .ok()
                .filter(|t| *t != ReactionType::None)
                .ok_or_else(|| {
                    HubError::invalid_param(format!(
                        "unknown reaction type {}",
                        body.reaction_type
                    ))
                })?;
            let target = body
                .target
                .as_ref()
                .ok_or_else(|| HubError::validation("reaction has no target"))?;
            if target.ts_hash.len() != TsHash::LEN {
                return Err(HubError::validation("reaction target must be a tsHash"));
            }
            Ok(())
        }
        (MessageType::AmpAdd | MessageType::AmpRemove, Some(Body::Amp(_))) => Ok(()),
        (MessageType::VerificationAddEthAddress, Some(Body::VerificationAdd(body))) => {
            if body.address.len() != 20 {
                return Err(HubError::validation("verification address must be 20 bytes"));
            }
            Ok(())
        }
        (MessageType::VerificationRemove, Some(Body::VerificationRemove(body))) => {
            if body.address.len() != 20 {
                return Err(HubError::validation("verification address must be 20 bytes"));
            }
            Ok(())
        }
        (MessageType::SignerAdd | MessageType::SignerRemove, Some(Body::Signer(body))) => {
            if body.signer.len() != 32 {
                return Err(HubError::validation("delegate signer must be 32 bytes"));
            }
            Ok(())
        }
        (MessageType::UserDataAdd, Some(Body::UserData(body))) => {
            UserDataType::try_from(body.data_type)
                .ok()
                .filter(|t| *t != UserDataType::None)
                .ok_or_else(|| {
                    HubError::invalid_param(format!("unknown user data type {}", body.data_type))
                })?;
            Ok(())
        }
        _ => Err(mismatch()),
    }
}
