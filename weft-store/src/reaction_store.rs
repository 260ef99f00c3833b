//! Reaction store: likes and recasts targeting casts.
//!
//! The conflict key is `(reactionType, castId)`, so one fid holds at most
//! one live reaction of each kind per cast. A by-target index under the
//! cast author's keyspace answers "who reacted to this cast".

use weft_model::proto::{Body, ReactionType};
use weft_model::{Fid, HubError, HubResult, Message, MessageType, TsHash};
use weft_storage::{keys, UserPostfix};

use crate::set::{MessageSet, SetDefinition};

pub struct ReactionDef;

impl SetDefinition for ReactionDef {
    const NAME: &'static str = "reaction";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::ReactionMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::ReactionAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = Some(UserPostfix::ReactionRemoves);
    const ADD_TYPE: MessageType = MessageType::ReactionAdd;
    const REMOVE_TYPE: Option<MessageType> = Some(MessageType::ReactionRemove);
    const DEFAULT_PRUNE_LIMIT: usize = 5_000;

    fn target(msg: &Message) -> HubResult<Vec<u8>> {
        let Some(Body::Reaction(body)) = msg.body() else {
            return Err(HubError::validation("reaction message has no reaction body"));
        };
        let cast = body
            .target
            .as_ref()
            .ok_or_else(|| HubError::validation("reaction has no target"))?;
        let mut target = Vec::with_capacity(1 + Fid::KEY_LEN + cast.ts_hash.len());
        target.push(body.reaction_type as u8);
        target.extend_from_slice(&Fid(cast.fid).to_key_bytes());
        target.extend_from_slice(&cast.ts_hash);
        Ok(target)
    }

    fn secondary_index_keys(msg: &Message) -> HubResult<Vec<Vec<u8>>> {
        let Some(Body::Reaction(body)) = msg.body() else {
            return Ok(Vec::new());
        };
        let Some(cast) = &body.target else {
            return Ok(Vec::new());
        };
        let cast_ts = TsHash::try_from(cast.ts_hash.as_slice())
            .map_err(|_| HubError::validation("reaction target must be a tsHash"))?;
        Ok(vec![by_target_key(
            Fid(cast.fid),
            &cast_ts,
            body.reaction_type as u8,
            msg.fid(),
            &msg.ts_hash()?,
        )])
    }
}

pub type ReactionStore = MessageSet<ReactionDef>;

/// `User | castFid | ReactionsByTarget | castTsHash | type | fid | tsHash` → empty
fn by_target_key(
    cast_fid: Fid,
    cast_ts: &TsHash,
    reaction_type: u8,
    fid: Fid,
    ts_hash: &TsHash,
) -> Vec<u8> {
    let mut key = keys::user_key(cast_fid, UserPostfix::ReactionsByTarget);
    key.extend_from_slice(cast_ts.as_bytes());
    key.push(reaction_type);
    key.extend_from_slice(&fid.to_key_bytes());
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

impl MessageSet<ReactionDef> {
    /// Live reactions of one kind on a cast.
    pub fn get_reactions_by_target(
        &self,
        cast_fid: Fid,
        cast_ts: &TsHash,
        reaction_type: ReactionType,
    ) -> HubResult<Vec<Message>> {
        let mut prefix = keys::user_key(cast_fid, UserPostfix::ReactionsByTarget);
        prefix.extend_from_slice(cast_ts.as_bytes());
        prefix.push(reaction_type as u8);

        let suffix_len = Fid::KEY_LEN + TsHash::LEN;
        let mut refs = Vec::new();
        self.db().scan_prefix(&prefix, |key, _| {
            if key.len() == prefix.len() + suffix_len {
                let mut fid_bytes = [0u8; Fid::KEY_LEN];
                fid_bytes.copy_from_slice(&key[prefix.len()..prefix.len() + Fid::KEY_LEN]);
                let mut ts_bytes = [0u8; TsHash::LEN];
                ts_bytes.copy_from_slice(&key[prefix.len() + Fid::KEY_LEN..]);
                refs.push((Fid::from_key_bytes(fid_bytes), TsHash::from(ts_bytes)));
            }
            Ok(true)
        })?;
        refs.into_iter()
            .map(|(fid, ts_hash)| self.get_message(fid, &ts_hash))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use weft_model::factories::{self, TestSigner};
    use weft_model::Hash;
    use weft_storage::HubDb;

    use super::*;
    use crate::events::EventBus;

    fn store() -> (tempfile::TempDir, ReactionStore) {
        let dir = tempdir().unwrap();
        let db = Arc::new(HubDb::open(dir.path()).unwrap());
        let store = ReactionStore::with_default_limit(db, EventBus::new());
        (dir, store)
    }

    fn cast_id() -> (Fid, TsHash) {
        (Fid(9), TsHash::new(50, &Hash([3u8; 16])))
    }

    #[test]
    fn test_like_then_unlike() {
        let (_dir, store) = store();
        let signer = TestSigner::generate();
        let fid = Fid(1);
        let target = cast_id();

        let like = factories::reaction(
            fid,
            MessageType::ReactionAdd,
            ReactionType::Like,
            target,
            100,
            &signer,
        );
        store.merge(&like).unwrap();
        assert_eq!(store.get_adds_by_fid(fid).unwrap(), vec![like.clone()]);

        let unlike = factories::reaction(
            fid,
            MessageType::ReactionRemove,
            ReactionType::Like,
            target,
            110,
            &signer,
        );
        store.merge(&unlike).unwrap();
        assert!(store.get_adds_by_fid(fid).unwrap().is_empty());
        assert_eq!(store.get_removes_by_fid(fid).unwrap(), vec![unlike]);
    }

    #[test]
    fn test_like_and_recast_are_independent_targets() {
        let (_dir, store) = store();
        let signer = TestSigner::generate();
        let fid = Fid(1);
        let target = cast_id();

        let like = factories::reaction(
            fid,
            MessageType::ReactionAdd,
            ReactionType::Like,
            target,
            100,
            &signer,
        );
        let recast = factories::reaction(
            fid,
            MessageType::ReactionAdd,
            ReactionType::Recast,
            target,
            100,
            &signer,
        );
        store.merge(&like).unwrap();
        store.merge(&recast).unwrap();
        assert_eq!(store.get_adds_by_fid(fid).unwrap().len(), 2);
    }

    #[test]
    fn test_reactions_by_target_index() {
        let (_dir, store) = store();
        let signer = TestSigner::generate();
        let target = cast_id();

        let like_a = factories::reaction(
            Fid(1),
            MessageType::ReactionAdd,
            ReactionType::Like,
            target,
            100,
            &signer,
        );
        let like_b = factories::reaction(
            Fid(2),
            MessageType::ReactionAdd,
            ReactionType::Like,
            target,
            101,
            &signer,
        );
        store.merge(&like_a).unwrap();
        store.merge(&like_b).unwrap();

        let likes = store
            .get_reactions_by_target(target.0, &target.1, ReactionType::Like)
            .unwrap();
        assert_eq!(likes.len(), 2);
        let recasts = store
            .get_reactions_by_target(target.0, &target.1, ReactionType::Recast)
            .unwrap();
        assert!(recasts.is_empty());
    }
}
