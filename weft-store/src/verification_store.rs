//! Verification store: proofs binding an Ethereum address to an fid.
//!
//! The conflict key is the verified address.

use weft_model::proto::Body;
use weft_model::{HubError, HubResult, Message, MessageType};
use weft_storage::UserPostfix;

use crate::set::{MessageSet, SetDefinition};

pub struct VerificationDef;

impl SetDefinition for VerificationDef {
    const NAME: &'static str = "verification";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::VerificationMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::VerificationAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = Some(UserPostfix::VerificationRemoves);
    const ADD_TYPE: MessageType = MessageType::VerificationAddEthAddress;
    const REMOVE_TYPE: Option<MessageType> = Some(MessageType::VerificationRemove);
    const DEFAULT_PRUNE_LIMIT: usize = 50;

    fn target(msg: &Message) -> HubResult<Vec<u8>> {
        match msg.body() {
            Some(Body::VerificationAdd(body)) => Ok(body.address.clone()),
            Some(Body::VerificationRemove(body)) => Ok(body.address.clone()),
            _ => Err(HubError::validation(
                "verification message has no verification body",
            )),
        }
    }
}

pub type VerificationStore = MessageSet<VerificationDef>;
