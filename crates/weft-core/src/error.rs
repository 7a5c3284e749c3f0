//! State machine errors for the coordination layer.

use crate::channel::ChannelState;
use crate::session::SessionState;
use thiserror::Error;

/// Session state machine violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A transition outside the forward-only session lifecycle
    #[error("invalid session transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// State the session was in
        from: SessionState,
        /// State the transition asked for
        to: SessionState,
    },
}

/// Channel state machine violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A transition outside the channel lifecycle
    #[error("invalid channel transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// State the channel was in
        from: ChannelState,
        /// State the transition asked for
        to: ChannelState,
    },
}
