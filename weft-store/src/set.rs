//! Generic per-fid CRDT message set.
//!
//! Every typed store is an instance of `MessageSet<D>`: two target-keyed
//! sets (adds and removes) whose conflicts resolve through the canonical
//! comparator. A winning merge deletes the losing message's rows and
//! writes the winner's rows in one KV transaction; prune and revoke are
//! transactional deletions that emit one event per dropped message.

use std::marker::PhantomData;
use std::sync::Arc;

use prost::Message as _;
use redb::ReadableTable;

use weft_model::message::message_compare;
use weft_model::{Fid, HubError, HubResult, Message, MessageType, TsHash};
use weft_storage::db::{StoreDbError, TABLE_DATA};
use weft_storage::keys;
use weft_storage::{HubDb, UserPostfix};

use crate::events::{EventBus, HubEvent};

/// Map a raw redb error into the core error surface.
pub(crate) fn db_err(e: impl Into<StoreDbError>) -> HubError {
    HubError::from(e.into())
}

/// Shape of one typed store: key postfixes, message types, target
/// derivation, and optional secondary indices.
pub trait SetDefinition: Send + Sync + 'static {
    /// Store name for diagnostics.
    const NAME: &'static str;
    const MESSAGE_POSTFIX: UserPostfix;
    const ADDS_POSTFIX: UserPostfix;
    /// `None` for add-only stores (UserData).
    const REMOVES_POSTFIX: Option<UserPostfix>;
    const ADD_TYPE: MessageType;
    const REMOVE_TYPE: Option<MessageType>;
    const DEFAULT_PRUNE_LIMIT: usize;

    /// The conflict key of a message within this set.
    fn target(msg: &Message) -> HubResult<Vec<u8>>;

    /// Store-specific secondary index keys for an Add message. Values are
    /// empty; the keys are written and deleted with the message row.
    fn secondary_index_keys(_msg: &Message) -> HubResult<Vec<Vec<u8>>> {
        Ok(Vec::new())
    }
}

enum MergeOutcome {
    /// The incoming message lost (or duplicated) an existing conflict.
    NoOp,
    /// The incoming message won; `displaced` lost their rows.
    Merged { displaced: Vec<Message> },
}

/// A per-fid add/remove CRDT set over one message type pair.
pub struct MessageSet<D: SetDefinition> {
    db: Arc<HubDb>,
    events: EventBus,
    prune_limit: usize,
    _def: PhantomData<D>,
}

impl<D: SetDefinition> MessageSet<D> {
    pub fn new(db: Arc<HubDb>, events: EventBus, prune_limit: usize) -> Self {
        Self {
            db,
            events,
            prune_limit,
            _def: PhantomData,
        }
    }

    pub fn with_default_limit(db: Arc<HubDb>, events: EventBus) -> Self {
        Self::new(db, events, D::DEFAULT_PRUNE_LIMIT)
    }

    pub fn prune_limit(&self) -> usize {
        self.prune_limit
    }

    /// The underlying database. Used by store-specific lookup extensions.
    pub fn db(&self) -> &Arc<HubDb> {
        &self.db
    }

    // ==================== Merge ====================

    /// Merge a validated message into the set.
    ///
    /// A message that loses to (or duplicates) the present state is a
    /// no-op. A winner is persisted together with its indices; displaced
    /// losers are emitted as `PruneMessage`.
    pub fn merge(&self, msg: &Message) -> HubResult<()> {
        let msg_type = msg.msg_type();
        if msg_type != D::ADD_TYPE && Some(msg_type) != D::REMOVE_TYPE {
            return Err(HubError::validation(format!(
                "{} store cannot merge {:?}",
                D::NAME,
                msg_type
            )));
        }

        let txn = self.db.begin_write()?;
        let outcome = {
            let mut table = txn.open_table(TABLE_DATA).map_err(db_err)?;
            self.merge_in_txn(&mut table, msg)?
        };

        match outcome {
            MergeOutcome::NoOp => Ok(()),
            MergeOutcome::Merged { displaced } => {
                txn.commit().map_err(db_err)?;
                self.events.emit(HubEvent::MergeMessage(msg.clone()));
                for loser in displaced {
                    self.events.emit(HubEvent::PruneMessage(loser));
                }
                Ok(())
            }
        }
    }

    fn merge_in_txn(
        &self,
        table: &mut redb::Table<&'static [u8], &'static [u8]>,
        msg: &Message,
    ) -> HubResult<MergeOutcome> {
        let fid = msg.fid();
        let target = D::target(msg)?;
        let ts_hash = msg.ts_hash()?;

        // Conflict resolution: the incoming message must beat every
        // existing entry at its target, removes checked first.
        let mut set_postfixes = Vec::with_capacity(2);
        if let Some(removes) = D::REMOVES_POSTFIX {
            set_postfixes.push(removes);
        }
        set_postfixes.push(D::ADDS_POSTFIX);

        let mut displaced = Vec::new();
        for postfix in set_postfixes {
            let set_key = keys::set_key(fid, postfix, &target);
            let existing_ts = table
                .get(set_key.as_slice())
                .map_err(db_err)?
                .map(|v| v.value().to_vec());
            let Some(raw_ts) = existing_ts else { continue };

            let existing_ts_hash = TsHash::try_from(raw_ts.as_slice())
                .map_err(|_| HubError::unknown(format!("{}: corrupt set index", D::NAME)))?;
            let existing = self.load_message(table, fid, &existing_ts_hash)?;

            if message_compare(msg, &existing) != std::cmp::Ordering::Greater {
                return Ok(MergeOutcome::NoOp);
            }
            displaced.push(existing);
        }

        for loser in &displaced {
            self.delete_message_rows(table, loser)?;
        }

        // Winner rows: message, set entry, by-signer relation, locator.
        let encoded = msg.encode_to_vec();
        table
            .insert(
                keys::message_key(fid, D::MESSAGE_POSTFIX, &ts_hash).as_slice(),
                encoded.as_slice(),
            )
            .map_err(db_err)?;
        let set_postfix = Self::set_postfix_for(msg)?;
        table
            .insert(
                keys::set_key(fid, set_postfix, &target).as_slice(),
                ts_hash.as_bytes().as_slice(),
            )
            .map_err(db_err)?;
        table
            .insert(
                keys::by_signer_key(fid, &msg.signer, &ts_hash).as_slice(),
                b"".as_slice(),
            )
            .map_err(db_err)?;
        table
            .insert(
                keys::ts_hash_index_key(&ts_hash).as_slice(),
                keys::ts_hash_index_value(fid, D::MESSAGE_POSTFIX).as_slice(),
            )
            .map_err(db_err)?;
        if !msg.is_remove() {
            for key in D::secondary_index_keys(msg)? {
                table
                    .insert(key.as_slice(), b"".as_slice())
                    .map_err(db_err)?;
            }
        }

        Ok(MergeOutcome::Merged { displaced })
    }

    // ==================== Prune ====================

    /// Delete the earliest messages (by tsHash) until the per-fid count
    /// is within the prune limit. Removes count toward the limit.
    pub fn prune_messages(&self, fid: Fid) -> HubResult<Vec<Message>> {
        let prefix = keys::user_key(fid, D::MESSAGE_POSTFIX);
        let count = self.db.count_prefix(&prefix)?;
        if count <= self.prune_limit {
            return Ok(Vec::new());
        }
        let excess = count - self.prune_limit;

        let mut raw_rows = Vec::with_capacity(excess);
        self.db.scan_prefix(&prefix, |_, value| {
            raw_rows.push(value.to_vec());
            Ok(raw_rows.len() < excess)
        })?;

        let mut pruned = Vec::with_capacity(raw_rows.len());
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(TABLE_DATA).map_err(db_err)?;
            for raw in &raw_rows {
                let msg = Message::decode(raw.as_slice())?;
                self.delete_message_rows(&mut table, &msg)?;
                pruned.push(msg);
            }
        }
        txn.commit().map_err(db_err)?;

        for msg in &pruned {
            self.events.emit(HubEvent::PruneMessage(msg.clone()));
        }
        tracing::debug!(store = D::NAME, fid = %fid, pruned = pruned.len(), "pruned messages");
        Ok(pruned)
    }

    // ==================== Revoke ====================

    /// Delete every message of this store signed by `signer` for `fid`,
    /// emitting `RevokeMessage` per deletion. Returns the revoked
    /// messages so callers can cascade (delegate signers).
    pub fn revoke_messages_by_signer(&self, fid: Fid, signer: &[u8]) -> HubResult<Vec<Message>> {
        let prefix = keys::by_signer_prefix(fid, signer);
        let mut ts_hashes = Vec::new();
        self.db.scan_prefix(&prefix, |key, _| {
            if key.len() >= prefix.len() + TsHash::LEN {
                let mut bytes = [0u8; TsHash::LEN];
                bytes.copy_from_slice(&key[key.len() - TsHash::LEN..]);
                ts_hashes.push(TsHash::from(bytes));
            }
            Ok(true)
        })?;
        if ts_hashes.is_empty() {
            return Ok(Vec::new());
        }

        let mut revoked = Vec::new();
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(TABLE_DATA).map_err(db_err)?;
            for ts_hash in &ts_hashes {
                let row_key = keys::message_key(fid, D::MESSAGE_POSTFIX, ts_hash);
                let raw = table
                    .get(row_key.as_slice())
                    .map_err(db_err)?
                    .map(|v| v.value().to_vec());
                // The by-signer relation spans every store; rows owned by
                // other stores are left for their owners.
                let Some(raw) = raw else { continue };
                let msg = Message::decode(raw.as_slice())?;
                self.delete_message_rows(&mut table, &msg)?;
                revoked.push(msg);
            }
        }
        txn.commit().map_err(db_err)?;

        for msg in &revoked {
            self.events.emit(HubEvent::RevokeMessage(msg.clone()));
        }
        Ok(revoked)
    }

    // ==================== Lookups ====================

    /// The current Add for a target, or `not_found`.
    pub fn get_add(&self, fid: Fid, target: &[u8]) -> HubResult<Message> {
        self.get_by_set(fid, D::ADDS_POSTFIX, target)
    }

    /// The current Remove for a target, or `not_found`.
    pub fn get_remove(&self, fid: Fid, target: &[u8]) -> HubResult<Message> {
        let postfix = D::REMOVES_POSTFIX
            .ok_or_else(|| HubError::invalid_param(format!("{} store has no removes", D::NAME)))?;
        self.get_by_set(fid, postfix, target)
    }

    fn get_by_set(&self, fid: Fid, postfix: UserPostfix, target: &[u8]) -> HubResult<Message> {
        let raw_ts = self
            .db
            .get(&keys::set_key(fid, postfix, target))?
            .ok_or_else(|| {
                HubError::not_found(format!("{}: no entry for target", D::NAME))
            })?;
        let ts_hash = TsHash::try_from(raw_ts.as_slice())
            .map_err(|_| HubError::unknown(format!("{}: corrupt set index", D::NAME)))?;
        self.get_message(fid, &ts_hash)
    }

    /// Load a message row by identity.
    pub fn get_message(&self, fid: Fid, ts_hash: &TsHash) -> HubResult<Message> {
        let raw = self
            .db
            .get(&keys::message_key(fid, D::MESSAGE_POSTFIX, ts_hash))?
            .ok_or_else(|| HubError::not_found(format!("{}: no message {}", D::NAME, ts_hash)))?;
        Ok(Message::decode(raw.as_slice())?)
    }

    /// All messages of this store for an fid, ascending by tsHash.
    pub fn get_all_messages_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        let prefix = keys::user_key(fid, D::MESSAGE_POSTFIX);
        let mut messages = Vec::new();
        let mut decode_failure = None;
        self.db.scan_prefix(&prefix, |_, value| {
            match Message::decode(value) {
                Ok(msg) => messages.push(msg),
                Err(e) => {
                    decode_failure = Some(e);
                    return Ok(false);
                }
            }
            Ok(true)
        })?;
        if let Some(e) = decode_failure {
            return Err(e.into());
        }
        Ok(messages)
    }

    /// Current Adds for an fid.
    pub fn get_adds_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        Ok(self
            .get_all_messages_by_fid(fid)?
            .into_iter()
            .filter(|m| m.msg_type() == D::ADD_TYPE)
            .collect())
    }

    /// Current Removes for an fid.
    pub fn get_removes_by_fid(&self, fid: Fid) -> HubResult<Vec<Message>> {
        Ok(self
            .get_all_messages_by_fid(fid)?
            .into_iter()
            .filter(|m| Some(m.msg_type()) == D::REMOVE_TYPE)
            .collect())
    }

    /// Number of message rows held for an fid.
    pub fn message_count(&self, fid: Fid) -> HubResult<usize> {
        Ok(self
            .db
            .count_prefix(&keys::user_key(fid, D::MESSAGE_POSTFIX))?)
    }

    // ==================== Internals ====================

    fn set_postfix_for(msg: &Message) -> HubResult<UserPostfix> {
        if msg.is_remove() {
            D::REMOVES_POSTFIX
                .ok_or_else(|| HubError::unknown(format!("{}: remove without remove set", D::NAME)))
        } else {
            Ok(D::ADDS_POSTFIX)
        }
    }

    fn load_message(
        &self,
        table: &redb::Table<&'static [u8], &'static [u8]>,
        fid: Fid,
        ts_hash: &TsHash,
    ) -> HubResult<Message> {
        let raw = table
            .get(keys::message_key(fid, D::MESSAGE_POSTFIX, ts_hash).as_slice())
            .map_err(db_err)?
            .map(|v| v.value().to_vec())
            .ok_or_else(|| {
                HubError::unknown(format!("{}: set index points at missing row", D::NAME))
            })?;
        Ok(Message::decode(raw.as_slice())?)
    }

    /// Delete a message row and every index row that references it.
    /// Must run inside the caller's transaction.
    fn delete_message_rows(
        &self,
        table: &mut redb::Table<&'static [u8], &'static [u8]>,
        msg: &Message,
    ) -> HubResult<()> {
        let fid = msg.fid();
        let ts_hash = msg.ts_hash()?;
        let target = D::target(msg)?;
        let set_postfix = Self::set_postfix_for(msg)?;

        table
            .remove(keys::message_key(fid, D::MESSAGE_POSTFIX, &ts_hash).as_slice())
            .map_err(db_err)?;

        // The set entry moves with the conflict winner; only drop it if it
        // still points at this message.
        let set_key = keys::set_key(fid, set_postfix, &target);
        let points_here = table
            .get(set_key.as_slice())
            .map_err(db_err)?
            .map(|v| v.value() == &ts_hash.as_bytes()[..])
            .unwrap_or(false);
        if points_here {
            table.remove(set_key.as_slice()).map_err(db_err)?;
        }

        table
            .remove(keys::by_signer_key(fid, &msg.signer, &ts_hash).as_slice())
            .map_err(db_err)?;
        table
            .remove(keys::ts_hash_index_key(&ts_hash).as_slice())
            .map_err(db_err)?;
        if !msg.is_remove() {
            for key in D::secondary_index_keys(msg)? {
                table.remove(key.as_slice()).map_err(db_err)?;
            }
        }
        Ok(())
    }
}
