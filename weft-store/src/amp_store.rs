//! Amp store: one fid amplifying another.
//!
//! The conflict key is the amplified fid.

use weft_model::proto::Body;
use weft_model::{Fid, HubError, HubResult, Message, MessageType};
use weft_storage::UserPostfix;

use crate::set::{MessageSet, SetDefinition};

pub struct AmpDef;

impl SetDefinition for AmpDef {
    const NAME: &'static str = "amp";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::AmpMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::AmpAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = Some(UserPostfix::AmpRemoves);
    const ADD_TYPE: MessageType = MessageType::AmpAdd;
    const REMOVE_TYPE: Option<MessageType> = Some(MessageType::AmpRemove);
    const DEFAULT_PRUNE_LIMIT: usize = 250;

    fn target(msg: &Message) -> HubResult<Vec<u8>> {
        match msg.body() {
            Some(Body::Amp(body)) => Ok(Fid(body.target_fid).to_key_bytes().to_vec()),
            _ => Err(HubError::validation("amp message has no amp body")),
        }
    }
}

pub type AmpStore = MessageSet<AmpDef>;
