//! Cast store: short text posts per fid.
//!
//! A CastAdd's target is its own tsHash; a CastRemove targets the add it
//! deletes. Adds additionally index by parent cast and by mentioned fid
//! so thread and mention lookups stay range scans.

use weft_model::proto::Body;
use weft_model::{Fid, HubError, HubResult, Message, MessageType, TsHash};
use weft_storage::{keys, UserPostfix};

use crate::set::{MessageSet, SetDefinition};

pub struct CastDef;

impl SetDefinition for CastDef {
    const NAME: &'static str = "cast";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::CastMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::CastAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = Some(UserPostfix::CastRemoves);
    const ADD_TYPE: MessageType = MessageType::CastAdd;
    const REMOVE_TYPE: Option<MessageType> = Some(MessageType::CastRemove);
    const DEFAULT_PRUNE_LIMIT: usize = 10_000;

    fn target(msg: &Message) -> HubResult<Vec<u8>> {
        match msg.body() {
            Some(Body::CastAdd(_)) => Ok(msg.ts_hash()?.as_bytes().to_vec()),
            Some(Body::CastRemove(body)) => Ok(body.target_ts_hash.clone()),
            _ => Err(HubError::validation("cast message has no cast body")),
        }
    }

    fn secondary_index_keys(msg: &Message) -> HubResult<Vec<Vec<u8>>> {
        let Some(Body::CastAdd(body)) = msg.body() else {
            return Ok(Vec::new());
        };
        let fid = msg.fid();
        let ts_hash = msg.ts_hash()?;

        let mut index_keys = Vec::new();
        if let Some(parent) = &body.parent {
            let parent_ts = TsHash::try_from(parent.ts_hash.as_slice())
                .map_err(|_| HubError::validation("cast parent must be a tsHash"))?;
            index_keys.push(by_parent_key(Fid(parent.fid), &parent_ts, fid, &ts_hash));
        }
        for mention in &body.mentions {
            index_keys.push(by_mention_key(Fid(*mention), fid, &ts_hash));
        }
        Ok(index_keys)
    }
}

pub type CastStore = MessageSet<CastDef>;

/// `User | parentFid | CastsByParent | parentTsHash | fid | tsHash` → empty
fn by_parent_key(parent_fid: Fid, parent_ts: &TsHash, fid: Fid, ts_hash: &TsHash) -> Vec<u8> {
    let mut key = keys::user_key(parent_fid, UserPostfix::CastsByParent);
    key.extend_from_slice(parent_ts.as_bytes());
    key.extend_from_slice(&fid.to_key_bytes());
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

/// `User | mentionedFid | CastsByMention | fid | tsHash` → empty
fn by_mention_key(mentioned: Fid, fid: Fid, ts_hash: &TsHash) -> Vec<u8> {
    let mut key = keys::user_key(mentioned, UserPostfix::CastsByMention);
    key.extend_from_slice(&fid.to_key_bytes());
    key.extend_from_slice(ts_hash.as_bytes());
    key
}

impl MessageSet<CastDef> {
    /// The active CastAdd with the given identity, or `not_found`.
    pub fn get_cast(&self, fid: Fid, ts_hash: &TsHash) -> HubResult<Message> {
        self.get_add(fid, ts_hash.as_bytes())
    }

    /// Replies to a cast, resolved through the by-parent index.
    pub fn get_casts_by_parent(&self, parent_fid: Fid, parent_ts: &TsHash) -> HubResult<Vec<Message>> {
        let mut prefix = keys::user_key(parent_fid, UserPostfix::CastsByParent);
        prefix.extend_from_slice(parent_ts.as_bytes());
        self.collect_referenced(&prefix)
    }

    /// Casts mentioning an fid, resolved through the by-mention index.
    pub fn get_casts_by_mention(&self, mentioned: Fid) -> HubResult<Vec<Message>> {
        let prefix = keys::user_key(mentioned, UserPostfix::CastsByMention);
        self.collect_referenced(&prefix)
    }

    /// Load the messages referenced by `fid ‖ tsHash` index-key suffixes.
    fn collect_referenced(&self, prefix: &[u8]) -> HubResult<Vec<Message>> {
        let refs = self.scan_index_refs(prefix)?;
        refs.into_iter()
            .map(|(fid, ts_hash)| self.get_message(fid, &ts_hash))
            .collect()
    }

    fn scan_index_refs(&self, prefix: &[u8]) -> HubResult<Vec<(Fid, TsHash)>> {
        let suffix_len = Fid::KEY_LEN + TsHash::LEN;
        let mut refs = Vec::new();
        self.db().scan_prefix(prefix, |key, _| {
            if key.len() == prefix.len() + suffix_len {
                let mut fid_bytes = [0u8; Fid::KEY_LEN];
                fid_bytes.copy_from_slice(&key[prefix.len()..prefix.len() + Fid::KEY_LEN]);
                let mut ts_bytes = [0u8; TsHash::LEN];
                ts_bytes.copy_from_slice(&key[prefix.len() + Fid::KEY_LEN..]);
                refs.push((Fid::from_key_bytes(fid_bytes), TsHash::from(ts_bytes)));
            }
            Ok(true)
        })?;
        Ok(refs)
    }
}
