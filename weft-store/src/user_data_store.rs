//! UserData store: profile fields keyed by data type.
//!
//! Add-only: there is no paired Remove. A later UserDataAdd with the same
//! dataType strictly supersedes the earlier one through the ordinary
//! add-set conflict, so the set holds at most one value per field.

use weft_model::proto::{Body, UserDataType};
use weft_model::{Fid, HubError, HubResult, Message, MessageType};
use weft_storage::UserPostfix;

use crate::set::{MessageSet, SetDefinition};

pub struct UserDataDef;

impl SetDefinition for UserDataDef {
    const NAME: &'static str = "user_data";
    const MESSAGE_POSTFIX: UserPostfix = UserPostfix::UserDataMessage;
    const ADDS_POSTFIX: UserPostfix = UserPostfix::UserDataAdds;
    const REMOVES_POSTFIX: Option<UserPostfix> = None;
    const ADD_TYPE: MessageType = MessageType::UserDataAdd;
    const REMOVE_TYPE: Option<MessageType> = None;
    const DEFAULT_PRUNE_LIMIT: usize = 100;

    fn target(msg: &Message) -> HubResult<Vec<u8>> {
        match msg.body() {
            Some(Body::UserData(body)) => Ok(vec![body.data_type as u8]),
            _ => Err(HubError::validation("user data message has no body")),
        }
    }
}

pub type UserDataStore = MessageSet<UserDataDef>;

impl MessageSet<UserDataDef> {
    /// The current value of one profile field, or `not_found`.
    pub fn get_user_data(&self, fid: Fid, data_type: UserDataType) -> HubResult<Message> {
        self.get_add(fid, &[data_type as u8])
    }
}
