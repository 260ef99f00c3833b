//! Identity store: on-chain custody event ingestion.
//!
//! For each fid the latest event by `(blockNumber, logIndex)` is current;
//! superseded events stay on disk for audit but lose their custody index
//! row. Colliding events at the same block position with different block
//! or transaction hashes indicate a chain inconsistency and are rejected.

use std::cmp::Ordering;
use std::sync::Arc;

use prost::Message as _;
use redb::ReadableTable;

use weft_model::{Fid, HubError, HubResult, IdRegistryEvent, IdRegistryEventType};
use weft_storage::db::TABLE_DATA;
use weft_storage::keys;
use weft_storage::HubDb;

use crate::events::{EventBus, HubEvent};
use crate::set::db_err;

pub struct IdentityStore {
    db: Arc<HubDb>,
    events: EventBus,
}

impl IdentityStore {
    pub fn new(db: Arc<HubDb>, events: EventBus) -> Self {
        Self { db, events }
    }

    /// Merge an identity event.
    ///
    /// Returns the superseded current event on replacement so the caller
    /// can schedule revocation of messages authorized under the previous
    /// custody; `None` for first events and no-ops.
    pub fn merge(&self, event: &IdRegistryEvent) -> HubResult<Option<IdRegistryEvent>> {
        Self::validate_event(event)?;
        let fid = Fid(event.fid);
        let current_key = keys::id_registry_event_key(fid);
        let encoded = event.encode_to_vec();

        let txn = self.db.begin_write()?;
        let merged: Option<Option<IdRegistryEvent>> = {
            let mut table = txn.open_table(TABLE_DATA).map_err(db_err)?;
            let current_raw = table
                .get(current_key.as_slice())
                .map_err(db_err)?
                .map(|v| v.value().to_vec());

            match current_raw {
                None => {
                    table
                        .insert(current_key.as_slice(), encoded.as_slice())
                        .map_err(db_err)?;
                    table
                        .insert(
                            keys::id_registry_by_custody_key(&event.to).as_slice(),
                            encoded.as_slice(),
                        )
                        .map_err(db_err)?;
                    Some(None)
                }
                Some(raw) => {
                    let current = IdRegistryEvent::decode(raw.as_slice())?;
                    let incoming = (event.block_number, event.log_index);
                    let existing = (current.block_number, current.log_index);
                    match incoming.cmp(&existing) {
                        Ordering::Equal => {
                            if event.block_hash != current.block_hash
                                || event.transaction_hash != current.transaction_hash
                            {
                                return Err(HubError::conflict(format!(
                                    "colliding identity events for fid {} at block {} log {}",
                                    event.fid, event.block_number, event.log_index
                                )));
                            }
                            None
                        }
                        Ordering::Less => None,
                        Ordering::Greater => {
                            // Retain the superseded event for audit, then
                            // move the current row and custody index.
                            table
                                .insert(
                                    keys::id_registry_archive_key(
                                        fid,
                                        current.block_number,
                                        current.log_index,
                                    )
                                    .as_slice(),
                                    raw.as_slice(),
                                )
                                .map_err(db_err)?;
                            table
                                .remove(keys::id_registry_by_custody_key(&current.to).as_slice())
                                .map_err(db_err)?;
                            table
                                .insert(current_key.as_slice(), encoded.as_slice())
                                .map_err(db_err)?;
                            table
                                .insert(
                                    keys::id_registry_by_custody_key(&event.to).as_slice(),
                                    encoded.as_slice(),
                                )
                                .map_err(db_err)?;
                            Some(Some(current))
                        }
                    }
                }
            }
        };

        match merged {
            Some(superseded) => {
                txn.commit().map_err(db_err)?;
                self.events
                    .emit(HubEvent::MergeIdRegistryEvent(event.clone()));
                Ok(superseded)
            }
            None => Ok(None),
        }
    }

    /// The current custody event for an fid, or `not_found`.
    pub fn get_custody_event(&self, fid: Fid) -> HubResult<IdRegistryEvent> {
        let raw = self
            .db
            .get(&keys::id_registry_event_key(fid))?
            .ok_or_else(|| HubError::not_found(format!("no custody event for fid {}", fid)))?;
        Ok(IdRegistryEvent::decode(raw.as_slice())?)
    }

    /// The current event holding custody at `address`, or `not_found`.
    pub fn get_by_custody_address(&self, address: &[u8]) -> HubResult<IdRegistryEvent> {
        let raw = self
            .db
            .get(&keys::id_registry_by_custody_key(address))?
            .ok_or_else(|| HubError::not_found("no event for custody address"))?;
        Ok(IdRegistryEvent::decode(raw.as_slice())?)
    }

    /// All fids with a current custody event, ascending.
    pub fn get_fids(&self) -> HubResult<Vec<Fid>> {
        let prefix = keys::id_registry_prefix();
        let mut fids = Vec::new();
        self.db.scan_prefix(&prefix, |key, _| {
            // Archive rows carry a block/log suffix; current rows do not.
            if key.len() == prefix.len() + Fid::KEY_LEN {
                let mut fid_bytes = [0u8; Fid::KEY_LEN];
                fid_bytes.copy_from_slice(&key[prefix.len()..]);
                fids.push(Fid::from_key_bytes(fid_bytes));
            }
            Ok(true)
        })?;
        Ok(fids)
    }

    fn validate_event(event: &IdRegistryEvent) -> HubResult<()> {
        let event_type = IdRegistryEventType::try_from(event.event_type).map_err(|_| {
            HubError::invalid_param(format!("unknown identity event type {}", event.event_type))
        })?;
        if event_type == IdRegistryEventType::None {
            return Err(HubError::validation("unknown identity event type"));
        }
        if event.to.len() != 20 {
            return Err(HubError::validation("custody address must be 20 bytes"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use weft_model::factories::{self, TestCustody};

    use super::*;

    fn store() -> (tempfile::TempDir, IdentityStore, EventBus) {
        let dir = tempdir().unwrap();
        let db = Arc::new(HubDb::open(dir.path()).unwrap());
        let events = EventBus::new();
        let store = IdentityStore::new(db, events.clone());
        (dir, store, events)
    }

    #[test]
    fn test_register_establishes_custody() {
        let (_dir, store, events) = store();
        let mut rx = events.subscribe();
        let custody = TestCustody::generate();
        let event = factories::register_event(Fid(1), &custody, 10);

        assert_eq!(store.merge(&event).unwrap(), None);
        assert_eq!(store.get_custody_event(Fid(1)).unwrap(), event);
        assert_eq!(
            store
                .get_by_custody_address(custody.address.as_bytes())
                .unwrap(),
            event
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            HubEvent::MergeIdRegistryEvent(e) if e == event
        ));
    }

    #[test]
    fn test_replayed_event_is_a_no_op() {
        let (_dir, store, events) = store();
        let custody = TestCustody::generate();
        let event = factories::register_event(Fid(1), &custody, 10);

        store.merge(&event).unwrap();
        let mut rx = events.subscribe();
        assert_eq!(store.merge(&event).unwrap(), None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_colliding_events_are_a_chain_inconsistency() {
        let (_dir, store, _events) = store();
        let custody = TestCustody::generate();
        let event = factories::register_event(Fid(1), &custody, 10);
        store.merge(&event).unwrap();

        // Same (block, log) but different hashes
        let mut collision = factories::register_event(Fid(1), &custody, 10);
        collision.log_index = event.log_index;
        let err = store.merge(&collision).unwrap_err();
        assert_eq!(err.code(), "bad_request.conflict");
        assert_eq!(store.get_custody_event(Fid(1)).unwrap(), event);
    }

    #[test]
    fn test_transfer_supersedes_and_returns_previous() {
        let (_dir, store, _events) = store();
        let a = TestCustody::generate();
        let b = TestCustody::generate();
        let register = factories::register_event(Fid(1), &a, 10);
        let transfer = factories::transfer_event(Fid(1), &a, &b, 11);

        store.merge(&register).unwrap();
        let superseded = store.merge(&transfer).unwrap();
        assert_eq!(superseded, Some(register));

        assert_eq!(store.get_custody_event(Fid(1)).unwrap(), transfer);
        assert_eq!(
            store.get_by_custody_address(b.address.as_bytes()).unwrap(),
            transfer
        );
        // Old custody address is no longer indexed as current
        assert!(store.get_by_custody_address(a.address.as_bytes()).is_err());
    }

    #[test]
    fn test_stale_event_does_not_replace() {
        let (_dir, store, _events) = store();
        let a = TestCustody::generate();
        let b = TestCustody::generate();
        let newer = factories::register_event(Fid(1), &b, 20);
        let older = factories::register_event(Fid(1), &a, 10);

        store.merge(&newer).unwrap();
        assert_eq!(store.merge(&older).unwrap(), None);
        assert_eq!(store.get_custody_event(Fid(1)).unwrap(), newer);
    }

    #[test]
    fn test_get_fids_skips_archive_rows() {
        let (_dir, store, _events) = store();
        let a = TestCustody::generate();
        let b = TestCustody::generate();

        store
            .merge(&factories::register_event(Fid(3), &a, 10))
            .unwrap();
        store
            .merge(&factories::register_event(Fid(1), &b, 10))
            .unwrap();
        store
            .merge(&factories::transfer_event(Fid(3), &a, &b, 11))
            .unwrap();

        assert_eq!(store.get_fids().unwrap(), vec![Fid(1), Fid(3)]);
    }
}
