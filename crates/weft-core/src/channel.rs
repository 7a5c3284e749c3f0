//! Channel state machine and port-forwarding descriptors.
//!
//! Channels are sub-multiplexed data paths nested inside an active
//! session. Unlike sessions they are not forward-only: pend and resume
//! alternate as cooperative flow control until the channel closes.

use crate::error::ChannelError;

/// Channel lifecycle states.
///
/// ```text
/// Open ──> Pending <──> Active
///   │         │            │
///   └─────────┴── Closed ──┘
/// ```
///
/// `Open` is the just-created, writable state. Pend moves a writable
/// channel to `Pending`; resume moves it back to `Active`. There is no
/// automatic resume-on-drain: resuming is an explicit caller action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Just created, writable
    Open,
    /// Backpressured by pend; writes are refused by the engine
    Pending,
    /// Resumed, writable
    Active,
    /// Torn down; terminal
    Closed,
}

/// A sub-channel within a session.
#[derive(Debug, Clone)]
pub struct Channel {
    friend_id: String,
    channel_id: u32,
    state: ChannelState,
}

impl Channel {
    /// Create a channel descriptor in `Open`.
    #[must_use]
    pub fn new(friend_id: impl Into<String>, channel_id: u32) -> Self {
        Self {
            friend_id: friend_id.into(),
            channel_id,
            state: ChannelState::Open,
        }
    }

    /// Friend whose session owns this channel.
    #[must_use]
    pub fn friend_id(&self) -> &str {
        &self.friend_id
    }

    /// Engine-assigned channel id.
    #[must_use]
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Whether writes are meaningful in the current state.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        matches!(self.state, ChannelState::Open | ChannelState::Active)
    }

    /// Check whether a transition is valid.
    #[must_use]
    pub fn can_transition(&self, to: ChannelState) -> bool {
        matches!(
            (self.state, to),
            (ChannelState::Open, ChannelState::Pending)
                | (ChannelState::Pending, ChannelState::Active)
                | (ChannelState::Active, ChannelState::Pending)
                | (
                    ChannelState::Open | ChannelState::Pending | ChannelState::Active,
                    ChannelState::Closed
                )
        )
    }

    /// Transition to a new state.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidTransition`] if the transition is
    /// not allowed from the current state.
    pub fn transition_to(&mut self, to: ChannelState) -> Result<(), ChannelError> {
        if !self.can_transition(to) {
            return Err(ChannelError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        let from = self.state;
        self.state = to;
        tracing::debug!(
            friend = %self.friend_id,
            channel = self.channel_id,
            "channel state transition: {:?} -> {:?}",
            from,
            to
        );
        Ok(())
    }
}

/// A tunnel forwarding a named service through a friend's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortForwarding {
    /// Friend whose session carries the tunnel
    pub friend_id: String,
    /// Name of the forwarded service
    pub service_name: String,
    /// Local bind host
    pub host: String,
    /// Local bind port
    pub port: u16,
    /// Engine-assigned tunnel id
    pub forwarding_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_channel_is_writable() {
        let channel = Channel::new("wfn-bob", 1);
        assert_eq!(channel.state(), ChannelState::Open);
        assert!(channel.is_writable());
    }

    #[test]
    fn pend_resume_alternates() {
        let mut channel = Channel::new("wfn-bob", 1);
        channel.transition_to(ChannelState::Pending).unwrap();
        assert!(!channel.is_writable());
        channel.transition_to(ChannelState::Active).unwrap();
        assert!(channel.is_writable());
        channel.transition_to(ChannelState::Pending).unwrap();
        channel.transition_to(ChannelState::Active).unwrap();
        assert_eq!(channel.state(), ChannelState::Active);
    }

    #[test]
    fn resume_without_pend_is_invalid() {
        let mut channel = Channel::new("wfn-bob", 1);
        let err = channel.transition_to(ChannelState::Active).unwrap_err();
        assert_eq!(
            err,
            ChannelError::InvalidTransition {
                from: ChannelState::Open,
                to: ChannelState::Active,
            }
        );
    }

    #[test]
    fn closed_is_terminal() {
        let mut channel = Channel::new("wfn-bob", 1);
        channel.transition_to(ChannelState::Closed).unwrap();
        for to in [
            ChannelState::Open,
            ChannelState::Pending,
            ChannelState::Active,
            ChannelState::Closed,
        ] {
            assert!(!channel.can_transition(to));
        }
    }
}
