//! The merge engine: validation, routing, and revocation fan-out.
//!
//! Every submission passes signature and hash checks, then the signer
//! chain: the fid must have a current custody event, Signer messages must
//! be signed by that custody address, and every other message by an
//! actively authorized delegate. Valid messages route to their typed
//! store; custody transfers cascade revocation through the previous
//! custody's delegates.

use std::collections::HashSet;
use std::sync::Arc;

use weft_model::message::{is_signer_type, validate_message};
use weft_model::proto::Body;
use weft_model::{Fid, HubError, HubResult, IdRegistryEvent, Message, MessageType, TsHash};
use weft_storage::{keys, HubDb, UserPostfix};

use crate::amp_store::AmpStore;
use crate::cast_store::CastStore;
use crate::events::EventBus;
use crate::identity_store::IdentityStore;
use crate::reaction_store::ReactionStore;
use crate::signer_store::SignerStore;
use crate::user_data_store::UserDataStore;
use crate::verification_store::VerificationStore;

/// Per-type prune limits.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub signer_prune_limit: usize,
    pub cast_prune_limit: usize,
    pub reaction_prune_limit: usize,
    pub amp_prune_limit: usize,
    pub verification_prune_limit: usize,
    pub user_data_prune_limit: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            signer_prune_limit: 100,
            cast_prune_limit: 10_000,
            reaction_prune_limit: 5_000,
            amp_prune_limit: 250,
            verification_prune_limit: 50,
            user_data_prune_limit: 100,
        }
    }
}

/// One hub replica's merge engine.
pub struct Engine {
    db: Arc<HubDb>,
    events: EventBus,
    identity: IdentityStore,
    signers: SignerStore,
    casts: CastStore,
    reactions: ReactionStore,
    amps: AmpStore,
    verifications: VerificationStore,
    user_data: UserDataStore,
}

impl Engine {
    pub fn new(db: Arc<HubDb>, events: EventBus) -> Self {
        Self::with_options(db, events, EngineOptions::default())
    }

    pub fn with_options(db: Arc<HubDb>, events: EventBus, options: EngineOptions) -> Self {
        Self {
            identity: IdentityStore::new(db.clone(), events.clone()),
            signers: SignerStore::new(db.clone(), events.clone(), options.signer_prune_limit),
            casts: CastStore::new(db.clone(), events.clone(), options.cast_prune_limit),
            reactions: ReactionStore::new(db.clone(), events.clone(), options.reaction_prune_limit),
            amps: AmpStore::new(db.clone(), events.clone(), options.amp_prune_limit),
            verifications: VerificationStore::new(
                db.clone(),
                events.clone(),
                options.verification_prune_limit,
            ),
            user_data: UserDataStore::new(db.clone(), events.clone(), options.user_data_prune_limit),
            db,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn signers(&self) -> &SignerStore {
        &self.signers
    }

    pub fn casts(&self) -> &CastStore {
        &self.casts
    }

    pub fn reactions(&self) -> &ReactionStore {
        &self.reactions
    }

    pub fn amps(&self) -> &AmpStore {
        &self.amps
    }

    pub fn verifications(&self) -> &VerificationStore {
        &self.verifications
    }

    pub fn user_data(&self) -> &UserDataStore {
        &self.user_data
    }

    // ==================== Message path ====================

    /// Validate and merge one message, then prune its store.
    pub fn merge_message(&self, msg: &Message) -> HubResult<()> {
        validate_message(msg)?;

        let fid = msg.fid();
        let msg_type = msg.msg_type();

        let custody = self
            .identity
            .get_custody_event(fid)
            .map_err(|_| HubError::validation("unknown fid"))?;

        if is_signer_type(msg_type) {
            if msg.signer != custody.to {
                return Err(HubError::validation(
                    "signer message is not signed by the current custody address",
                ));
            }
        } else if self.signers.get_active_signer(fid, &msg.signer).is_err() {
            return Err(HubError::validation("invalid signer"));
        }

        match msg_type {
            MessageType::SignerAdd | MessageType::SignerRemove => {
                self.signers.merge(msg)?;
                self.signers.prune_messages(fid)?;
            }
            MessageType::CastAdd | MessageType::CastRemove => {
                self.casts.merge(msg)?;
                self.casts.prune_messages(fid)?;
            }
            MessageType::ReactionAdd | MessageType::ReactionRemove => {
                self.reactions.merge(msg)?;
                self.reactions.prune_messages(fid)?;
            }
            MessageType::AmpAdd | MessageType::AmpRemove => {
                self.amps.merge(msg)?;
                self.amps.prune_messages(fid)?;
            }
            MessageType::VerificationAddEthAddress | MessageType::VerificationRemove => {
                self.verifications.merge(msg)?;
                self.verifications.prune_messages(fid)?;
            }
            MessageType::UserDataAdd => {
                self.user_data.merge(msg)?;
                self.user_data.prune_messages(fid)?;
            }
            MessageType::None => {
                return Err(HubError::validation("unknown message type"));
            }
        }

        // SignerRemove revokes everything the delegate signed.
        if msg_type == MessageType::SignerRemove {
            if let Some(Body::Signer(body)) = msg.body() {
                if self.signers.get_active_signer(fid, &body.signer).is_err() {
                    self.revoke_messages_by_signer(fid, &body.signer)?;
                }
            }
        }

        Ok(())
    }

    // ==================== Identity path ====================

    /// Merge a custody event; on transfer, revoke every message
    /// authorized under the previous custody (two-phase: the event
    /// commits first, revocations follow as observable deletions).
    pub fn merge_id_registry_event(&self, event: &IdRegistryEvent) -> HubResult<()> {
        if let Some(superseded) = self.identity.merge(event)? {
            let revoked = self.revoke_messages_by_signer(Fid(event.fid), &superseded.to)?;
            tracing::info!(
                fid = event.fid,
                revoked,
                "custody transfer revoked prior messages"
            );
        }
        Ok(())
    }

    /// Revoke every message for `fid` signed by `signer`, cascading
    /// through delegate keys whose SignerAdds are revoked along the way.
    /// Returns the number of deleted messages.
    pub fn revoke_messages_by_signer(&self, fid: Fid, signer: &[u8]) -> HubResult<usize> {
        let mut pending = vec![signer.to_vec()];
        let mut visited: HashSet<Vec<u8>> = HashSet::new();
        let mut revoked = 0usize;

        while let Some(signer) = pending.pop() {
            if !visited.insert(signer.clone()) {
                continue;
            }

            // The signer store goes first: revoked SignerAdds name the
            // delegates whose messages must go next.
            let dropped = self.signers.revoke_messages_by_signer(fid, &signer)?;
            for msg in &dropped {
                if msg.msg_type() == MessageType::SignerAdd {
                    if let Some(Body::Signer(body)) = msg.body() {
                        pending.push(body.signer.clone());
                    }
                }
            }
            revoked += dropped.len();

            revoked += self.casts.revoke_messages_by_signer(fid, &signer)?.len();
            revoked += self.reactions.revoke_messages_by_signer(fid, &signer)?.len();
            revoked += self.amps.revoke_messages_by_signer(fid, &signer)?.len();
            revoked += self
                .verifications
                .revoke_messages_by_signer(fid, &signer)?
                .len();
            revoked += self.user_data.revoke_messages_by_signer(fid, &signer)?.len();
        }
        Ok(revoked)
    }

    // ==================== Lookups ====================

    pub fn get_fids(&self) -> HubResult<Vec<Fid>> {
        self.identity.get_fids()
    }

    pub fn get_custody_event(&self, fid: Fid) -> HubResult<IdRegistryEvent> {
        self.identity.get_custody_event(fid)
    }

    /// Resolve a message by identity through the global tsHash locator.
    pub fn get_message_by_ts_hash(&self, ts_hash: &TsHash) -> HubResult<Message> {
        let raw = self
            .db
            .get(&keys::ts_hash_index_key(ts_hash))?
            .ok_or_else(|| HubError::not_found(format!("no message {}", ts_hash)))?;
        let (fid, postfix) = keys::parse_ts_hash_index_value(&raw)
            .ok_or_else(|| HubError::unknown("corrupt tsHash locator"))?;
        match postfix {
            UserPostfix::SignerMessage => self.signers.get_message(fid, ts_hash),
            UserPostfix::CastMessage => self.casts.get_message(fid, ts_hash),
            UserPostfix::ReactionMessage => self.reactions.get_message(fid, ts_hash),
            UserPostfix::AmpMessage => self.amps.get_message(fid, ts_hash),
            UserPostfix::VerificationMessage => self.verifications.get_message(fid, ts_hash),
            UserPostfix::UserDataMessage => self.user_data.get_message(fid, ts_hash),
            _ => Err(HubError::unknown("tsHash locator names a non-message row")),
        }
    }
}
