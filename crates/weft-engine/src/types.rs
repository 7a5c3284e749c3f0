//! Shared data types carried across the engine boundary.
//!
//! Commands and events exchange these types by value; they are plain
//! serde-serializable data with no behavior beyond small conversions.

use serde::{Deserialize, Serialize};

/// A node's public profile.
///
/// All fields are plain strings and default to empty. The engine treats
/// the profile as a single unit: updates always carry the full six-field
/// record (see `ProfileUpdate::into_profile`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name
    pub name: String,
    /// Free-form gender string
    pub gender: String,
    /// Region / locale
    pub region: String,
    /// Phone number
    pub phone: String,
    /// Email address
    pub email: String,
    /// Free-form description
    pub description: String,
}

/// A partial profile update.
///
/// Fields left as `None` are NOT preserved from the stored profile: the
/// update is merged over an all-empty [`UserProfile`], so an omitted
/// field reverts to the empty string. This full-replace-with-defaults
/// behavior is the engine's accepted call shape, preserved deliberately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// Display name, if set
    pub name: Option<String>,
    /// Gender, if set
    pub gender: Option<String>,
    /// Region, if set
    pub region: Option<String>,
    /// Phone, if set
    pub phone: Option<String>,
    /// Email, if set
    pub email: Option<String>,
    /// Description, if set
    pub description: Option<String>,
}

impl ProfileUpdate {
    /// Merge this update over an all-empty profile.
    #[must_use]
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            name: self.name.unwrap_or_default(),
            gender: self.gender.unwrap_or_default(),
            region: self.region.unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
        }
    }
}

/// Broadcast availability state of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    /// Reachable and available
    #[default]
    Online = 0,
    /// Reachable but away
    Away = 1,
    /// Reachable but busy
    Busy = 2,
}

impl Presence {
    /// Numeric value used on the engine wire surface.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Presence {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Presence::Online),
            1 => Ok(Presence::Away),
            2 => Ok(Presence::Busy),
            other => Err(other),
        }
    }
}

/// A peer with an established (accepted) relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    /// Unique friend identifier (the peer's node id)
    pub friend_id: String,
    /// Local-only alias, no network effect
    #[serde(default)]
    pub label: String,
    /// The peer's profile as last reported by the engine
    #[serde(default)]
    pub info: UserProfile,
    /// The peer's presence as last reported by the engine
    #[serde(default)]
    pub presence: Presence,
}

impl Friend {
    /// Create a friend entry with empty label and default presence.
    #[must_use]
    pub fn new(friend_id: impl Into<String>, info: UserProfile) -> Self {
        Self {
            friend_id: friend_id.into(),
            label: String::new(),
            info,
            presence: Presence::Online,
        }
    }
}

/// Stream payload type negotiated for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamType {
    /// Audio frames
    Audio,
    /// Video frames
    Video,
    /// Interactive text
    Text,
    /// Opaque application data
    Application,
    /// Store-and-forward messages
    Message,
}

/// Stream mode flag set.
///
/// Modes combine with `|`: a multiplexing stream is usually also
/// reliable, and port forwarding requires multiplexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMode(u32);

impl StreamMode {
    /// Datagram-style delivery, no guarantees
    pub const PLAIN: Self = Self(0);
    /// Ordered, lossless delivery
    pub const RELIABLE: Self = Self(1);
    /// Channel multiplexing on top of the stream
    pub const MULTIPLEXING: Self = Self(1 << 1);
    /// Port-forwarding tunnels on top of multiplexing
    pub const PORT_FORWARDING: Self = Self(1 << 2);

    /// Check whether all flags in `other` are set.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw flag bits.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for StreamMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Peer decision on a session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    /// The peer accepted the session
    Accepted,
    /// The peer rejected the session; the request cannot be retried on
    /// the same session descriptor
    Rejected {
        /// Engine- or peer-supplied reason
        reason: String,
    },
}

impl ReplyStatus {
    /// True for [`ReplyStatus::Accepted`].
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, ReplyStatus::Accepted)
    }
}

/// Node connectivity to the network, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Attached to the network
    Connected,
    /// Detached from the network
    Disconnected,
}

/// Condition of a session's underlying data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamCondition {
    /// Allocated, transport not yet ready
    Initialized,
    /// Transport ready, negotiation pending
    TransportReady,
    /// Connecting to the peer
    Connecting,
    /// Carrying data
    Connected,
    /// Deactivated by flow control
    Deactivated,
    /// Torn down
    Closed,
    /// Failed; the session will not recover
    Failed,
}

/// State of a port-forwarding tunnel, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardingState {
    /// Tunnel is open and proxying
    Opened,
    /// Tunnel has been torn down
    Closed,
    /// Tunnel failed; a new one must be opened
    Failed,
}
