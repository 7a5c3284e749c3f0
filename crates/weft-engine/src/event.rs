//! Typed event catalog for the engine surface.
//!
//! The engine pushes these events to a node's subscription stream. The
//! catalog is fixed: a node subscribes to all of it at construction and
//! routes each kind to a registered handler or a default logging one.

use crate::types::{
    ConnectionStatus, ForwardingState, Friend, Presence, ReplyStatus, StreamCondition,
    UserProfile,
};

/// Kind discriminant for [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Incoming friend request
    FriendRequest,
    /// A friend was added to the list
    FriendAdded,
    /// A friend was removed from the list
    FriendRemoved,
    /// A friend changed presence
    FriendPresence,
    /// A friend sent a message
    FriendMessage,
    /// This node's connectivity changed
    ConnectionStatus,
    /// A peer requested a session
    SessionRequest,
    /// A peer answered our session request
    SessionReply,
    /// A session stream changed condition
    StreamState,
    /// Data arrived on a session stream
    StreamData,
    /// A peer opened a sub-channel
    ChannelOpened,
    /// A sub-channel was closed
    ChannelClosed,
    /// Data arrived on a sub-channel
    ChannelData,
    /// A forwarding tunnel changed state
    PortForwardingState,
}

impl EventKind {
    /// The node-level event catalog.
    pub const NODE: [EventKind; 6] = [
        EventKind::FriendRequest,
        EventKind::FriendAdded,
        EventKind::FriendRemoved,
        EventKind::FriendPresence,
        EventKind::FriendMessage,
        EventKind::ConnectionStatus,
    ];

    /// The stream/channel-level event catalog.
    pub const STREAM: [EventKind; 8] = [
        EventKind::SessionRequest,
        EventKind::SessionReply,
        EventKind::StreamState,
        EventKind::StreamData,
        EventKind::ChannelOpened,
        EventKind::ChannelClosed,
        EventKind::ChannelData,
        EventKind::PortForwardingState,
    ];

    /// The full fixed catalog a node subscribes to.
    #[must_use]
    pub fn all() -> impl Iterator<Item = EventKind> {
        Self::NODE.into_iter().chain(Self::STREAM)
    }

    /// Stable name used in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EventKind::FriendRequest => "onFriendRequest",
            EventKind::FriendAdded => "onFriendAdded",
            EventKind::FriendRemoved => "onFriendRemoved",
            EventKind::FriendPresence => "onFriendPresence",
            EventKind::FriendMessage => "onFriendMessage",
            EventKind::ConnectionStatus => "onConnectionStatus",
            EventKind::SessionRequest => "onSessionRequest",
            EventKind::SessionReply => "onSessionReply",
            EventKind::StreamState => "onStreamState",
            EventKind::StreamData => "onStreamData",
            EventKind::ChannelOpened => "onChannelOpened",
            EventKind::ChannelClosed => "onChannelClosed",
            EventKind::ChannelData => "onChannelData",
            EventKind::PortForwardingState => "onPortForwardingState",
        }
    }
}

/// An event delivered on a node's subscription stream.
///
/// Payload fields appear in the order the engine emits them.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A peer asked to become a friend
    FriendRequest {
        /// Requester's node id
        user_id: String,
        /// Requester's profile
        profile: UserProfile,
        /// Greeting sent with the request
        greeting: String,
    },
    /// A friend entered the list (request accepted, or reported at start)
    FriendAdded {
        /// The new friend
        friend: Friend,
    },
    /// A friend left the list
    FriendRemoved {
        /// The removed friend's id
        friend_id: String,
    },
    /// A friend changed presence
    FriendPresence {
        /// Friend id
        friend_id: String,
        /// New presence
        presence: Presence,
    },
    /// A friend sent a message
    FriendMessage {
        /// Sender's friend id
        friend_id: String,
        /// Message body
        message: String,
    },
    /// This node's network connectivity changed
    ConnectionStatus {
        /// New status
        status: ConnectionStatus,
    },
    /// A peer requested a session with this node
    SessionRequest {
        /// Requesting friend's id
        friend_id: String,
    },
    /// A peer answered this node's session request
    SessionReply {
        /// Replying friend's id
        friend_id: String,
        /// The peer's decision
        status: ReplyStatus,
    },
    /// A session stream changed condition
    StreamState {
        /// Friend owning the session
        friend_id: String,
        /// New condition
        condition: StreamCondition,
    },
    /// Data arrived on a session stream
    StreamData {
        /// Friend owning the session
        friend_id: String,
        /// Payload
        data: Vec<u8>,
    },
    /// A sub-channel was opened by the peer
    ChannelOpened {
        /// Friend owning the session
        friend_id: String,
        /// Channel id
        channel_id: u32,
    },
    /// A sub-channel was closed
    ChannelClosed {
        /// Friend owning the session
        friend_id: String,
        /// Channel id
        channel_id: u32,
    },
    /// Data arrived on a sub-channel
    ChannelData {
        /// Friend owning the session
        friend_id: String,
        /// Channel id
        channel_id: u32,
        /// Payload
        data: Vec<u8>,
    },
    /// A forwarding tunnel changed state
    PortForwardingState {
        /// Friend owning the session
        friend_id: String,
        /// Tunnel id
        forwarding_id: u32,
        /// New state
        state: ForwardingState,
    },
}

impl Event {
    /// Kind discriminant for catalog routing.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Event::FriendRequest { .. } => EventKind::FriendRequest,
            Event::FriendAdded { .. } => EventKind::FriendAdded,
            Event::FriendRemoved { .. } => EventKind::FriendRemoved,
            Event::FriendPresence { .. } => EventKind::FriendPresence,
            Event::FriendMessage { .. } => EventKind::FriendMessage,
            Event::ConnectionStatus { .. } => EventKind::ConnectionStatus,
            Event::SessionRequest { .. } => EventKind::SessionRequest,
            Event::SessionReply { .. } => EventKind::SessionReply,
            Event::StreamState { .. } => EventKind::StreamState,
            Event::StreamData { .. } => EventKind::StreamData,
            Event::ChannelOpened { .. } => EventKind::ChannelOpened,
            Event::ChannelClosed { .. } => EventKind::ChannelClosed,
            Event::ChannelData { .. } => EventKind::ChannelData,
            Event::PortForwardingState { .. } => EventKind::PortForwardingState,
        }
    }
}
