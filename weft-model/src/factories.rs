//! Message and event factories for tests.
//!
//! Enabled by the `test-utils` feature so downstream crates can build
//! correctly signed fixtures without duplicating signing plumbing.

use prost::Message as _;

use crate::crypto;
use crate::proto::{
    AmpBody, Body, CastAddBody, CastId, CastRemoveBody, HashScheme, IdRegistryEvent,
    IdRegistryEventType, Message, MessageData, MessageType, Network, ReactionBody, ReactionType,
    SignatureScheme, SignerBody, UserDataBody, UserDataType, VerificationAddBody,
    VerificationRemoveBody,
};
use crate::types::{EthAddress, Fid, PubKey, TsHash};

/// A delegate signer keypair for test messages.
pub struct TestSigner {
    pub signing_key: ed25519_dalek::SigningKey,
    pub pubkey: PubKey,
}

impl TestSigner {
    pub fn generate() -> Self {
        let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        let pubkey = PubKey(signing_key.verifying_key().to_bytes());
        Self { signing_key, pubkey }
    }
}

/// A custody keypair (secp256k1) for test Signer messages and events.
pub struct TestCustody {
    pub signing_key: k256::ecdsa::SigningKey,
    pub address: EthAddress,
}

impl TestCustody {
    pub fn generate() -> Self {
        let signing_key = k256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
        let address = crypto::eth_address(signing_key.verifying_key());
        Self { signing_key, address }
    }
}

fn data(fid: Fid, timestamp: u32, msg_type: MessageType, body: Body) -> MessageData {
    MessageData {
        fid: fid.0,
        timestamp,
        network: Network::Devnet as i32,
        msg_type: msg_type as i32,
        body: Some(body),
    }
}

/// Hash and Ed25519-sign a payload.
pub fn sign(data: MessageData, signer: &TestSigner) -> Message {
    let hash = crypto::blake3_16(&data.encode_to_vec());
    let signature = crypto::sign_hash(&signer.signing_key, &hash);
    Message {
        data: Some(data),
        hash: hash.as_bytes().to_vec(),
        hash_scheme: HashScheme::Blake3 as i32,
        signature: signature.as_bytes().to_vec(),
        signature_scheme: SignatureScheme::Ed25519 as i32,
        signer: signer.pubkey.as_bytes().to_vec(),
    }
}

/// Hash and custody-sign a payload.
pub fn sign_custody(data: MessageData, custody: &TestCustody) -> Message {
    let hash = crypto::blake3_16(&data.encode_to_vec());
    let signature =
        crypto::sign_hash_eth(&custody.signing_key, &hash).expect("custody signing failed");
    Message {
        data: Some(data),
        hash: hash.as_bytes().to_vec(),
        hash_scheme: HashScheme::Blake3 as i32,
        signature,
        signature_scheme: SignatureScheme::Eip712 as i32,
        signer: custody.address.as_bytes().to_vec(),
    }
}

pub fn cast_add(fid: Fid, text: &str, timestamp: u32, signer: &TestSigner) -> Message {
    let body = Body::CastAdd(CastAddBody {
        text: text.to_string(),
        mentions: vec![],
        parent: None,
        embeds: vec![],
    });
    sign(data(fid, timestamp, MessageType::CastAdd, body), signer)
}

pub fn cast_add_with_parent(
    fid: Fid,
    text: &str,
    parent: (Fid, TsHash),
    timestamp: u32,
    signer: &TestSigner,
) -> Message {
    let body = Body::CastAdd(CastAddBody {
        text: text.to_string(),
        mentions: vec![],
        parent: Some(CastId {
            fid: parent.0 .0,
            ts_hash: parent.1.as_bytes().to_vec(),
        }),
        embeds: vec![],
    });
    sign(data(fid, timestamp, MessageType::CastAdd, body), signer)
}

pub fn cast_add_with_mentions(
    fid: Fid,
    text: &str,
    mentions: &[Fid],
    timestamp: u32,
    signer: &TestSigner,
) -> Message {
    let body = Body::CastAdd(CastAddBody {
        text: text.to_string(),
        mentions: mentions.iter().map(|f| f.0).collect(),
        parent: None,
        embeds: vec![],
    });
    sign(data(fid, timestamp, MessageType::CastAdd, body), signer)
}

pub fn cast_remove(fid: Fid, target: TsHash, timestamp: u32, signer: &TestSigner) -> Message {
    let body = Body::CastRemove(CastRemoveBody {
        target_ts_hash: target.as_bytes().to_vec(),
    });
    sign(data(fid, timestamp, MessageType::CastRemove, body), signer)
}

pub fn reaction(
    fid: Fid,
    msg_type: MessageType,
    reaction_type: ReactionType,
    target: (Fid, TsHash),
    timestamp: u32,
    signer: &TestSigner,
) -> Message {
    let body = Body::Reaction(ReactionBody {
        reaction_type: reaction_type as i32,
        target: Some(CastId {
            fid: target.0 .0,
            ts_hash: target.1.as_bytes().to_vec(),
        }),
    });
    sign(data(fid, timestamp, msg_type, body), signer)
}

pub fn amp(
    fid: Fid,
    msg_type: MessageType,
    target_fid: Fid,
    timestamp: u32,
    signer: &TestSigner,
) -> Message {
    let body = Body::Amp(AmpBody {
        target_fid: target_fid.0,
    });
    sign(data(fid, timestamp, msg_type, body), signer)
}

pub fn verification_add(
    fid: Fid,
    address: EthAddress,
    timestamp: u32,
    signer: &TestSigner,
) -> Message {
    let body = Body::VerificationAdd(VerificationAddBody {
        address: address.as_bytes().to_vec(),
        claim_signature: vec![0u8; 65],
        block_hash: vec![0u8; 32],
    });
    sign(
        data(fid, timestamp, MessageType::VerificationAddEthAddress, body),
        signer,
    )
}

pub fn verification_remove(
    fid: Fid,
    address: EthAddress,
    timestamp: u32,
    signer: &TestSigner,
) -> Message {
    let body = Body::VerificationRemove(VerificationRemoveBody {
        address: address.as_bytes().to_vec(),
    });
    sign(data(fid, timestamp, MessageType::VerificationRemove, body), signer)
}

pub fn user_data(
    fid: Fid,
    data_type: UserDataType,
    value: &str,
    timestamp: u32,
    signer: &TestSigner,
) -> Message {
    let body = Body::UserData(UserDataBody {
        data_type: data_type as i32,
        value: value.to_string(),
    });
    sign(data(fid, timestamp, MessageType::UserDataAdd, body), signer)
}

pub fn signer_add(
    fid: Fid,
    delegate: &PubKey,
    timestamp: u32,
    custody: &TestCustody,
) -> Message {
    let body = Body::Signer(SignerBody {
        signer: delegate.as_bytes().to_vec(),
    });
    sign_custody(data(fid, timestamp, MessageType::SignerAdd, body), custody)
}

pub fn signer_remove(
    fid: Fid,
    delegate: &PubKey,
    timestamp: u32,
    custody: &TestCustody,
) -> Message {
    let body = Body::Signer(SignerBody {
        signer: delegate.as_bytes().to_vec(),
    });
    sign_custody(data(fid, timestamp, MessageType::SignerRemove, body), custody)
}

/// Build a Register event for a fresh custody address.
pub fn register_event(fid: Fid, custody: &TestCustody, block_number: u64) -> IdRegistryEvent {
    IdRegistryEvent {
        event_type: IdRegistryEventType::Register as i32,
        block_number,
        log_index: 0,
        block_hash: random_bytes(32),
        transaction_hash: random_bytes(32),
        fid: fid.0,
        from: vec![],
        to: custody.address.as_bytes().to_vec(),
    }
}

/// Build a Transfer event from one custody address to another.
pub fn transfer_event(
    fid: Fid,
    from: &TestCustody,
    to: &TestCustody,
    block_number: u64,
) -> IdRegistryEvent {
    IdRegistryEvent {
        event_type: IdRegistryEventType::Transfer as i32,
        block_number,
        log_index: 0,
        block_hash: random_bytes(32),
        transaction_hash: random_bytes(32),
        fid: fid.0,
        from: from.address.as_bytes().to_vec(),
        to: to.address.as_bytes().to_vec(),
    }
}

fn random_bytes(len: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes
}
