//! Session state machine.
//!
//! A session is a negotiated data-exchange context with one friend,
//! parameterized by stream type and mode. Its lifecycle is strictly
//! forward: once closed, a session is discarded and a new one must be
//! created to communicate with that friend again.

use crate::error::SessionError;
use weft_engine::{StreamMode, StreamType};

/// Session lifecycle states.
///
/// ```text
/// Idle ──> Requested ──> Replied ──> Active ──> Closed
///   └──────────┴─────────────┴──────────┴────────^
/// ```
///
/// Every state can close; nothing leaves `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Descriptor allocated, nothing sent
    Idle,
    /// Request sent to the peer, awaiting its decision
    Requested,
    /// Peer accepted; stream coming up
    Replied,
    /// Stream carrying data
    Active,
    /// Torn down or rejected; terminal
    Closed,
}

/// A session descriptor with one friend.
#[derive(Debug, Clone)]
pub struct Session {
    friend_id: String,
    stream_type: StreamType,
    stream_mode: StreamMode,
    stream_id: Option<u32>,
    state: SessionState,
}

impl Session {
    /// Allocate a descriptor in `Idle`.
    #[must_use]
    pub fn new(friend_id: impl Into<String>, stream_type: StreamType, stream_mode: StreamMode) -> Self {
        Self {
            friend_id: friend_id.into(),
            stream_type,
            stream_mode,
            stream_id: None,
            state: SessionState::Idle,
        }
    }

    /// Friend owning this session.
    #[must_use]
    pub fn friend_id(&self) -> &str {
        &self.friend_id
    }

    /// Negotiated payload type.
    #[must_use]
    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    /// Negotiated mode flags.
    #[must_use]
    pub fn stream_mode(&self) -> StreamMode {
        self.stream_mode
    }

    /// Engine-assigned stream id, once known.
    #[must_use]
    pub fn stream_id(&self) -> Option<u32> {
        self.stream_id
    }

    /// Record the engine-assigned stream id.
    pub fn set_stream_id(&mut self, stream_id: u32) {
        self.stream_id = Some(stream_id);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session still occupies its friend slot.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state != SessionState::Closed
    }

    /// Check whether a transition is valid.
    #[must_use]
    pub fn can_transition(&self, to: SessionState) -> bool {
        matches!(
            (self.state, to),
            (SessionState::Idle, SessionState::Requested)
                | (SessionState::Requested, SessionState::Replied)
                | (SessionState::Replied, SessionState::Active)
                | (
                    SessionState::Idle
                        | SessionState::Requested
                        | SessionState::Replied
                        | SessionState::Active,
                    SessionState::Closed
                )
        )
    }

    /// Transition to a new state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] if the transition is
    /// not allowed from the current state.
    pub fn transition_to(&mut self, to: SessionState) -> Result<(), SessionError> {
        if !self.can_transition(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        let from = self.state;
        self.state = to;
        tracing::debug!(
            friend = %self.friend_id,
            "session state transition: {:?} -> {:?}",
            from,
            to
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("wfn-bob", StreamType::Application, StreamMode::RELIABLE)
    }

    #[test]
    fn accept_path_reaches_active() {
        let mut session = session();
        assert_eq!(session.state(), SessionState::Idle);
        session.transition_to(SessionState::Requested).unwrap();
        session.transition_to(SessionState::Replied).unwrap();
        session.transition_to(SessionState::Active).unwrap();
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn rejection_closes_from_requested() {
        let mut session = session();
        session.transition_to(SessionState::Requested).unwrap();
        session.transition_to(SessionState::Closed).unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.is_live());
    }

    #[test]
    fn no_skipping_forward() {
        let mut session = session();
        assert!(!session.can_transition(SessionState::Active));
        assert!(session.transition_to(SessionState::Active).is_err());
        assert!(!session.can_transition(SessionState::Replied));
    }

    #[test]
    fn closed_is_absorbing() {
        let mut session = session();
        session.transition_to(SessionState::Closed).unwrap();
        for to in [
            SessionState::Idle,
            SessionState::Requested,
            SessionState::Replied,
            SessionState::Active,
            SessionState::Closed,
        ] {
            assert!(!session.can_transition(to), "Closed -> {to:?} must be invalid");
        }
    }

    #[test]
    fn failed_transition_leaves_state_unchanged() {
        let mut session = session();
        session.transition_to(SessionState::Requested).unwrap();
        let err = session.transition_to(SessionState::Requested).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: SessionState::Requested,
                to: SessionState::Requested,
            }
        );
        assert_eq!(session.state(), SessionState::Requested);
    }

    #[test]
    fn stream_id_recorded_once_known() {
        let mut session = session();
        assert_eq!(session.stream_id(), None);
        session.set_stream_id(7);
        assert_eq!(session.stream_id(), Some(7));
    }
}
