//! Signer store: delegate-key authorization per fid.
//!
//! Targets are the delegate Ed25519 public key. SignerAdd/SignerRemove
//! messages are signed by the fid's custody address; revoking a
//! SignerAdd cascades to every message the delegate signed.

use weft_model::proto::Body;
use weft_model::{HubError, HubResult, Message, MessageType};
use weft_storage::UserPostfix;

use crate::set::{MessageSet, SetDefinition};

pub struct SignerDef;

impl SetDefinition for SignerDef {
    const NAME: &'static str = "signer";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::SignerMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::SignerAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = Some(UserPostfix::SignerRemoves);
    const ADD_TYPE: MessageType = MessageType::SignerAdd;
    const REMOVE_TYPE: Option<MessageType> = Some(MessageType::SignerRemove);
    const DEFAULT_PRUNE_LIMIT: usize = 100;

    fn target(msg: &Message) -> HubResult<Vec<u8>> {
        match msg.body() {
            Some(Body::Signer(body)) => Ok(body.signer.clone()),
            _ => Err(HubError::validation("signer message has no signer body")),
        }
    }
}

pub type SignerStore = MessageSet<SignerDef>;

impl MessageSet<SignerDef> {
    /// The active SignerAdd for a delegate key, or `not_found`.
    pub fn get_active_signer(&self, fid: weft_model::Fid, delegate: &[u8]) -> HubResult<Message> {
        self.get_add(fid, delegate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use weft_model::factories::{self, TestCustody, TestSigner};
    use weft_model::Fid;
    use weft_storage::HubDb;

    use super::*;
    use crate::events::{EventBus, HubEvent};

    fn store() -> (tempfile::TempDir, SignerStore, EventBus) {
        let dir = tempdir().unwrap();
        let db = Arc::new(HubDb::open(dir.path()).unwrap());
        let events = EventBus::new();
        let store = SignerStore::with_default_limit(db, events.clone());
        (dir, store, events)
    }

    #[test]
    fn test_add_then_lookup() {
        let (_dir, store, _events) = store();
        let custody = TestCustody::generate();
        let delegate = TestSigner::generate();
        let fid = Fid(1);

        let add = factories::signer_add(fid, &delegate.pubkey, 100, &custody);
        store.merge(&add).unwrap();

        let found = store.get_active_signer(fid, delegate.pubkey.as_bytes()).unwrap();
        assert_eq!(found, add);
        assert!(store.get_remove(fid, delegate.pubkey.as_bytes()).is_err());
    }

    #[test]
    fn test_remove_beats_add_at_equal_timestamp_either_order() {
        // Equal timestamps: the Remove wins regardless of submission order.
        for add_first in [true, false] {
            let (_dir, store, _events) = store();
            let custody = TestCustody::generate();
            let delegate = TestSigner::generate();
            let fid = Fid(1);

            let add = factories::signer_add(fid, &delegate.pubkey, 100, &custody);
            let remove = factories::signer_remove(fid, &delegate.pubkey, 100, &custody);

            if add_first {
                store.merge(&add).unwrap();
                store.merge(&remove).unwrap();
            } else {
                store.merge(&remove).unwrap();
                store.merge(&add).unwrap();
            }

            let err = store.get_add(fid, delegate.pubkey.as_bytes()).unwrap_err();
            assert_eq!(err.code(), "not_found");
            let found = store.get_remove(fid, delegate.pubkey.as_bytes()).unwrap();
            assert_eq!(found, remove);
        }
    }

    #[test]
    fn test_later_add_resurrects_removed_signer() {
        let (_dir, store, _events) = store();
        let custody = TestCustody::generate();
        let delegate = TestSigner::generate();
        let fid = Fid(1);

        store
            .merge(&factories::signer_remove(fid, &delegate.pubkey, 100, &custody))
            .unwrap();
        let add = factories::signer_add(fid, &delegate.pubkey, 101, &custody);
        store.merge(&add).unwrap();

        assert_eq!(store.get_add(fid, delegate.pubkey.as_bytes()).unwrap(), add);
        assert!(store.get_remove(fid, delegate.pubkey.as_bytes()).is_err());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (_dir, store, _events) = store();
        let custody = TestCustody::generate();
        let delegate = TestSigner::generate();
        let fid = Fid(1);

        let add = factories::signer_add(fid, &delegate.pubkey, 100, &custody);
        store.merge(&add).unwrap();
        store.merge(&add).unwrap();

        assert_eq!(store.message_count(fid).unwrap(), 1);
    }

    #[test]
    fn test_displaced_loser_emits_prune_event() {
        let (_dir, store, events) = store();
        let mut rx = events.subscribe();
        let custody = TestCustody::generate();
        let delegate = TestSigner::generate();
        let fid = Fid(1);

        let add = factories::signer_add(fid, &delegate.pubkey, 100, &custody);
        let remove = factories::signer_remove(fid, &delegate.pubkey, 101, &custody);
        store.merge(&add).unwrap();
        store.merge(&remove).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), HubEvent::MergeMessage(m) if m == add));
        assert!(matches!(rx.try_recv().unwrap(), HubEvent::MergeMessage(m) if m == remove));
        assert!(matches!(rx.try_recv().unwrap(), HubEvent::PruneMessage(m) if m == add));
    }

    #[test]
    fn test_rejects_foreign_message_type() {
        let (_dir, store, _events) = store();
        let signer = TestSigner::generate();
        let cast = factories::cast_add(Fid(1), "hello", 100, &signer);
        let err = store.merge(&cast).unwrap_err();
        assert_eq!(err.code(), "bad_request.validation_failure");
    }
}
