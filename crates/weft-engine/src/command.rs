//! Typed command catalog for the engine surface.
//!
//! Every operation the coordination layer can request from the engine is
//! one variant here. Variants carry typed fields rather than the
//! positional argument lists of the native call convention; `name()`
//! returns the wire name the engine knows the command by.

use crate::config::BootstrapConfig;
use crate::types::{Presence, ReplyStatus, StreamMode, StreamType, UserProfile};

/// Target of a stream write.
///
/// The native surface conflates stream ids and friend ids into a single
/// parameter; this union keeps the two identifier spaces apart so the
/// engine never has to guess which one it was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// A concrete stream id previously returned by the engine
    Stream(u32),
    /// The single stream of the session with this friend
    Friend(String),
}

/// A command issued to the engine.
///
/// Node-scoped commands carry the issuing node's id in `node`; the three
/// static queries (`GetVersion`, `IsValidAddress`, `IsValidId`) are
/// node-independent.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Query the engine's running version
    GetVersion,
    /// Validate an address against the engine's format rules
    IsValidAddress {
        /// Candidate address
        address: String,
    },
    /// Validate a node id against the engine's format rules
    IsValidId {
        /// Candidate node id
        node_id: String,
    },
    /// Attach a node to the network
    CreateObject {
        /// Bootstrap configuration; `config.name` identifies the node
        config: BootstrapConfig,
    },
    /// Query the node's network address
    GetAddress {
        /// Issuing node
        node: String,
    },
    /// Query the node's network id
    GetNodeId {
        /// Issuing node
        node: String,
    },
    /// Query the node's own profile
    GetSelfInfo {
        /// Issuing node
        node: String,
    },
    /// Replace the node's own profile
    SetSelfInfo {
        /// Issuing node
        node: String,
        /// Full six-field profile record
        info: UserProfile,
    },
    /// Set the node's broadcast presence
    SetSelfPresence {
        /// Issuing node
        node: String,
        /// New presence
        presence: Presence,
    },
    /// Send a friend request to a peer address
    AddFriend {
        /// Issuing node
        node: String,
        /// Target peer address
        address: String,
        /// Greeting shown with the request
        greeting: String,
    },
    /// Accept an incoming friend request
    AcceptFriend {
        /// Issuing node
        node: String,
        /// Requester's node id
        user_id: String,
    },
    /// Query a friend's profile
    GetFriendInfo {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
    },
    /// Send a message to a friend
    SendFriendMessage {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Message body
        message: String,
    },
    /// Remove a friend relationship
    RemoveFriend {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
    },
    /// Set a local-only alias for a friend
    SetLabel {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// New label
        label: String,
    },
    /// Enumerate the friend list
    GetFriendList {
        /// Issuing node
        node: String,
    },
    /// Detach the node from the network
    Close {
        /// Issuing node
        node: String,
    },
    /// Discard engine-side persistent state for the node
    Clean {
        /// Issuing node
        node: String,
    },
    /// Allocate a session with a friend
    CreateSession {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Payload type
        stream_type: StreamType,
        /// Stream mode flags
        stream_mode: StreamMode,
    },
    /// Send the session request to the peer
    SessionRequest {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
    },
    /// Answer a received session request
    SessionReplyRequest {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Accept or reject (with reason)
        status: ReplyStatus,
    },
    /// Write data onto a session stream
    WriteStream {
        /// Issuing node
        node: String,
        /// Stream or friend target
        target: StreamTarget,
        /// Payload
        data: Vec<u8>,
    },
    /// Remove a session's stream
    RemoveStream {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
    },
    /// Close a session
    CloseSession {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
    },
    /// Register a named local service eligible for forwarding
    AddService {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Service name
        service_name: String,
        /// Service host
        host: String,
        /// Service port
        port: u16,
    },
    /// Unregister a named local service
    RemoveService {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Service name
        service_name: String,
    },
    /// Open a tunnel forwarding a friend's named service
    OpenPortForwarding {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Name of the service to forward
        service_name: String,
        /// Local bind host
        host: String,
        /// Local bind port
        port: u16,
    },
    /// Tear down a forwarding tunnel
    ClosePortForwarding {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Tunnel id returned by the open command
        forwarding_id: u32,
    },
    /// Open a sub-channel within a session
    OpenChannel {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Opaque negotiation cookie handed to the peer
        cookie: String,
    },
    /// Close a sub-channel
    CloseChannel {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Channel id
        channel_id: u32,
    },
    /// Write data onto a sub-channel
    WriteChannel {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Channel id
        channel_id: u32,
        /// Payload
        data: Vec<u8>,
    },
    /// Signal backpressure on a sub-channel
    PendChannel {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Channel id
        channel_id: u32,
    },
    /// Lift backpressure on a sub-channel
    ResumeChannel {
        /// Issuing node
        node: String,
        /// Friend id
        friend_id: String,
        /// Channel id
        channel_id: u32,
    },
}

impl Command {
    /// The wire name the engine knows this command by.
    ///
    /// `OpenPortForwarding` maps to `openPortFowarding`: the engine's
    /// historical spelling, kept verbatim on the wire surface only.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetVersion => "getVersion",
            Command::IsValidAddress { .. } => "isValidAddress",
            Command::IsValidId { .. } => "isValidId",
            Command::CreateObject { .. } => "createObject",
            Command::GetAddress { .. } => "getAddress",
            Command::GetNodeId { .. } => "getNodeId",
            Command::GetSelfInfo { .. } => "getSelfInfo",
            Command::SetSelfInfo { .. } => "setSelfInfo",
            Command::SetSelfPresence { .. } => "setSelfPresence",
            Command::AddFriend { .. } => "addFriend",
            Command::AcceptFriend { .. } => "acceptFriend",
            Command::GetFriendInfo { .. } => "getFriendInfo",
            Command::SendFriendMessage { .. } => "sendFriendMessageTo",
            Command::RemoveFriend { .. } => "removeFriend",
            Command::SetLabel { .. } => "setLabel",
            Command::GetFriendList { .. } => "getFriendList",
            Command::Close { .. } => "close",
            Command::Clean { .. } => "clean",
            Command::CreateSession { .. } => "createSession",
            Command::SessionRequest { .. } => "sessionRequest",
            Command::SessionReplyRequest { .. } => "sessionReplyRequest",
            Command::WriteStream { .. } => "writeStream",
            Command::RemoveStream { .. } => "removeStream",
            Command::CloseSession { .. } => "closeSession",
            Command::AddService { .. } => "addService",
            Command::RemoveService { .. } => "removeService",
            Command::OpenPortForwarding { .. } => "openPortFowarding",
            Command::ClosePortForwarding { .. } => "closePortForwarding",
            Command::OpenChannel { .. } => "openChannel",
            Command::CloseChannel { .. } => "closeChannel",
            Command::WriteChannel { .. } => "writeChannel",
            Command::PendChannel { .. } => "pendChannel",
            Command::ResumeChannel { .. } => "resumeChannel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_engine_surface() {
        assert_eq!(Command::GetVersion.name(), "getVersion");
        assert_eq!(
            Command::SendFriendMessage {
                node: "a".into(),
                friend_id: "b".into(),
                message: "hi".into(),
            }
            .name(),
            "sendFriendMessageTo"
        );
        // Historical engine spelling, preserved on the wire only.
        assert_eq!(
            Command::OpenPortForwarding {
                node: "a".into(),
                friend_id: "b".into(),
                service_name: "web".into(),
                host: "127.0.0.1".into(),
                port: 8080,
            }
            .name(),
            "openPortFowarding"
        );
    }
}
