//! Centralized cryptographic operations for the hub.
//!
//! **All** hashing, Ed25519 verification, and custody-address signature
//! recovery go through this module. This provides a single audit surface
//! for cryptographic correctness.
//!
//! # Primitives
//!
//! | Primitive | Algorithm            | Purpose                                |
//! |-----------|----------------------|----------------------------------------|
//! | Hash      | BLAKE3 (16 B XOF)    | Message identity, trie node digests    |
//! | Signature | Ed25519 (64 B)       | Delegate-signer message signing        |
//! | Signature | secp256k1 recoverable| Custody-address (Signer) messages      |

use sha3::{Digest, Keccak256};

use crate::types::{EthAddress, Hash, PubKey, Signature};

// ---------------------------------------------------------------------------
// Content hashing (BLAKE3, dkLen = 16)
// ---------------------------------------------------------------------------

/// Compute the 16-byte BLAKE3 digest of arbitrary bytes.
///
/// Used for: message hashes, trie leaf and node digests, excluded-hash
/// summaries during sync.
#[inline]
pub fn blake3_16(data: &[u8]) -> Hash {
    let mut out = [0u8; 16];
    blake3::Hasher::new()
        .update(data)
        .finalize_xof()
        .fill(&mut out);
    Hash(out)
}

/// The digest of empty input; the per-level placeholder in trie snapshots.
pub fn empty_hash() -> Hash {
    blake3_16(&[])
}

// ---------------------------------------------------------------------------
// Ed25519 (delegate signers)
// ---------------------------------------------------------------------------

/// Sign a message hash with an Ed25519 signing key.
///
/// The canonical signing pattern: compute `blake3_16(data_bytes)`, then
/// sign the 16-byte digest.
pub fn sign_hash(signing_key: &ed25519_dalek::SigningKey, hash: &Hash) -> Signature {
    use ed25519_dalek::Signer;
    Signature(signing_key.sign(hash.as_bytes()).to_bytes())
}

/// Verify an Ed25519 signature over a message hash (strict).
///
/// Uses `verify_strict()` (rejects small-order keys, checks canonical S).
pub fn verify_hash(pubkey: &PubKey, hash: &Hash, signature: &Signature) -> Result<(), CryptoError> {
    let vk = verifying_key(pubkey)?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(hash.as_bytes(), &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Deserialize a `PubKey` into an Ed25519 `VerifyingKey`.
///
/// Fails if the 32 bytes are not a valid curve point.
pub fn verifying_key(pubkey: &PubKey) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
    ed25519_dalek::VerifyingKey::from_bytes(&pubkey.0).map_err(|_| CryptoError::InvalidPublicKey)
}

// ---------------------------------------------------------------------------
// Custody-address signatures (secp256k1 recovery)
// ---------------------------------------------------------------------------

/// Derive the Ethereum address of a secp256k1 verifying key:
/// the last 20 bytes of `keccak256(uncompressed_point)`.
pub fn eth_address(vk: &k256::ecdsa::VerifyingKey) -> EthAddress {
    let point = vk.to_encoded_point(false);
    let digest: [u8; 32] = Keccak256::digest(&point.as_bytes()[1..]).into();
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..]);
    EthAddress(addr)
}

/// Sign a message hash with a custody key, producing a 65-byte
/// recoverable signature (`r ‖ s ‖ v`).
///
/// The signed prehash is `keccak256(hash)` so recovery operates on a
/// full-width scalar input.
pub fn sign_hash_eth(
    signing_key: &k256::ecdsa::SigningKey,
    hash: &Hash,
) -> Result<Vec<u8>, CryptoError> {
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    let prehash: [u8; 32] = Keccak256::digest(hash.as_bytes()).into();
    let (sig, recid): (k256::ecdsa::Signature, k256::ecdsa::RecoveryId) = signing_key
        .sign_prehash(&prehash)
        .map_err(|_| CryptoError::SigningFailed)?;
    let sig_bytes = sig.to_bytes();
    let mut out = Vec::with_capacity(65);
    out.extend_from_slice(sig_bytes.as_slice());
    out.push(recid.to_byte());
    Ok(out)
}

/// Verify a 65-byte recoverable custody signature over a message hash:
/// recover the public key from `keccak256(hash)` and compare its derived
/// address to the expected custody address.
pub fn verify_hash_eth(
    address: &EthAddress,
    hash: &Hash,
    signature: &[u8],
) -> Result<(), CryptoError> {
    if signature.len() != 65 {
        return Err(CryptoError::InvalidSignature);
    }
    let sig = k256::ecdsa::Signature::from_slice(&signature[..64])
        .map_err(|_| CryptoError::InvalidSignature)?;
    let recid =
        k256::ecdsa::RecoveryId::from_byte(signature[64]).ok_or(CryptoError::InvalidSignature)?;
    let prehash: [u8; 32] = Keccak256::digest(hash.as_bytes()).into();
    let vk = k256::ecdsa::VerifyingKey::recover_from_prehash(&prehash, &sig, recid)
        .map_err(|_| CryptoError::InvalidSignature)?;
    if eth_address(&vk) == *address {
        Ok(())
    } else {
        Err(CryptoError::InvalidSignature)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Cryptographic operation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid Ed25519 public key")]
    InvalidPublicKey,

    #[error("signing failed")]
    SigningFailed,
}
