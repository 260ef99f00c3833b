//! Typed error surface of the hub core.
//!
//! Every fallible core operation returns `HubResult<T>`. Variants map 1:1
//! to the dotted error codes exchanged with peers and RPC clients; storage
//! and decode failures are folded in at the core boundary.

use thiserror::Error;

pub type HubResult<T> = Result<T, HubError>;

/// Hub core error with a stable dotted code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// Missing fid, unknown signer, unknown message type.
    #[error("bad_request.validation_failure: {0}")]
    ValidationFailure(String),

    /// Chain-inconsistent IdRegistry events.
    #[error("bad_request.conflict: {0}")]
    Conflict(String),

    /// Malformed bytes.
    #[error("bad_request.parse_failure: {0}")]
    ParseFailure(String),

    /// Unknown enum value, out-of-range argument.
    #[error("bad_request.invalid_param: {0}")]
    InvalidParam(String),

    /// Missing custody event, missing message by target.
    #[error("not_found: {0}")]
    NotFound(String),

    /// RPC/transport failure during sync.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Invariant-violating internal error. Fatal to the current operation,
    /// logged, never propagated to peers.
    #[error("unknown: {0}")]
    Unknown(String),
}

impl HubError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailure(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseFailure(msg.into())
    }

    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParam(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// The stable dotted code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailure(_) => "bad_request.validation_failure",
            Self::Conflict(_) => "bad_request.conflict",
            Self::ParseFailure(_) => "bad_request.parse_failure",
            Self::InvalidParam(_) => "bad_request.invalid_param",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Unknown(_) => "unknown",
        }
    }

    /// True for any `bad_request.*` code.
    pub fn is_bad_request(&self) -> bool {
        self.code().starts_with("bad_request")
    }
}

impl From<prost::DecodeError> for HubError {
    fn from(e: prost::DecodeError) -> Self {
        Self::ParseFailure(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_dotted() {
        assert_eq!(
            HubError::validation("x").code(),
            "bad_request.validation_failure"
        );
        assert_eq!(HubError::conflict("x").code(), "bad_request.conflict");
        assert_eq!(HubError::not_found("x").code(), "not_found");
        assert!(HubError::invalid_param("x").is_bad_request());
        assert!(!HubError::unavailable("x").is_bad_request());
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err = HubError::not_found("no custody event for fid 42");
        assert_eq!(err.to_string(), "not_found: no custody event for fid 42");
    }
}
