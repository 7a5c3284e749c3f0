//! Error types for the Node API.
//!
//! Two failure families meet here: opaque engine failures, surfaced
//! verbatim as [`NodeError::Engine`], and local failures from this
//! layer's own bookkeeping (unresolved ids, state machine violations,
//! unexpected engine value shapes). Nothing is retried automatically.

use crate::error::{ChannelError, SessionError};
use std::borrow::Cow;
use thiserror::Error;
use weft_engine::EngineError;

/// Errors that can occur in Node operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    /// The engine failed a command; payload surfaced verbatim
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Friend id unresolved in the local friend map
    #[error("unknown friend `{0}`")]
    FriendNotFound(String),

    /// No session descriptor exists for the friend
    #[error("no session with friend `{0}`")]
    SessionNotFound(String),

    /// Channel id unresolved within the friend's session
    #[error("unknown channel {channel_id} for friend `{friend_id}`")]
    ChannelNotFound {
        /// Friend owning the session
        friend_id: String,
        /// Unresolved channel id
        channel_id: u32,
    },

    /// Forwarding id unresolved within the friend's session
    #[error("unknown forwarding {forwarding_id} for friend `{friend_id}`")]
    ForwardingNotFound {
        /// Friend owning the session
        friend_id: String,
        /// Unresolved tunnel id
        forwarding_id: u32,
    },

    /// Operation attempted outside its valid session/channel state
    #[error("invalid state: {0}")]
    InvalidState(Cow<'static, str>),

    /// Engine value did not match the shape the command promises
    #[error("unexpected engine value: {0}")]
    Decode(String),
}

impl NodeError {
    /// Create an invalid state error with static context.
    #[must_use]
    pub const fn invalid_state(context: &'static str) -> Self {
        NodeError::InvalidState(Cow::Borrowed(context))
    }

    /// Returns true if this error is a local id-resolution failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NodeError::FriendNotFound(_)
                | NodeError::SessionNotFound(_)
                | NodeError::ChannelNotFound { .. }
                | NodeError::ForwardingNotFound { .. }
        )
    }
}

impl From<SessionError> for NodeError {
    fn from(err: SessionError) -> Self {
        NodeError::InvalidState(Cow::Owned(err.to_string()))
    }
}

impl From<ChannelError> for NodeError {
    fn from(err: ChannelError) -> Self {
        NodeError::InvalidState(Cow::Owned(err.to_string()))
    }
}

/// Result type for Node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
