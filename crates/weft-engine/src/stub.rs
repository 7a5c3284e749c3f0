//! In-process stub engine.
//!
//! A deterministic [`Engine`] implementation holding the whole network in
//! memory: every node created through it is a peer of every other, so
//! friend requests, sessions, channels and tunnels resolve locally and
//! synchronously. The test suites run against it; applications can use it
//! as a single-process engine for demos.
//!
//! # Declared format rules
//!
//! The stub's identity space is derived from node names:
//! - addresses are 52 characters and start with `WFA`
//! - node ids are 46 characters and start with `WFN`
//!
//! `isValidAddress` / `isValidId` check exactly these rules.

use crate::command::{Command, StreamTarget};
use crate::config::BootstrapConfig;
use crate::engine::{Completion, Engine, Value};
use crate::error::EngineError;
use crate::event::Event;
use crate::types::{
    ConnectionStatus, ForwardingState, Friend, Presence, ReplyStatus, StreamCondition,
    UserProfile,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Version string reported by `getVersion`.
pub const STUB_VERSION: &str = "1.2.0-stub";

// Engine error codes declared by the stub.
const ERR_UNKNOWN_NODE: i32 = 1;
const ERR_UNKNOWN_FRIEND: i32 = 2;
const ERR_NO_PENDING: i32 = 3;
const ERR_NO_SESSION: i32 = 4;
const ERR_NOT_ACTIVE: i32 = 5;
const ERR_UNKNOWN_CHANNEL: i32 = 6;
const ERR_CHANNEL_PENDING: i32 = 7;
const ERR_UNKNOWN_SERVICE: i32 = 8;
const ERR_UNKNOWN_FORWARDING: i32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Requested,
    Active,
    Closed,
}

struct StubSession {
    stream_id: u32,
    phase: Mutex<Phase>,
}

struct StubChannel {
    /// Node names of the two endpoints
    endpoints: [String; 2],
    /// Network ids of the two endpoints, same order
    endpoint_ids: [String; 2],
    pending: AtomicBool,
}

impl StubChannel {
    /// Index of `node` among the endpoints, if it is one.
    fn side_of(&self, node: &str) -> Option<usize> {
        self.endpoints.iter().position(|n| n == node)
    }
}

struct PendingRequest {
    from_node: String,
    greeting: String,
}

struct StubNode {
    address: String,
    node_id: String,
    attached: AtomicBool,
    profile: Mutex<UserProfile>,
    presence: Mutex<Presence>,
    friends: DashMap<String, Friend>,
    pending: DashMap<String, PendingRequest>,
    services: DashMap<String, (String, u16)>,
    sessions: DashMap<String, StubSession>,
    forwardings: DashMap<u32, String>,
}

impl StubNode {
    fn new(name: &str) -> Self {
        Self {
            address: StubEngine::derive_address(name),
            node_id: StubEngine::derive_node_id(name),
            attached: AtomicBool::new(true),
            profile: Mutex::new(UserProfile::default()),
            presence: Mutex::new(Presence::Online),
            friends: DashMap::new(),
            pending: DashMap::new(),
            services: DashMap::new(),
            sessions: DashMap::new(),
            forwardings: DashMap::new(),
        }
    }

    fn snapshot_friend(&self) -> (UserProfile, Presence) {
        let profile = self.profile.lock().map(|p| p.clone()).unwrap_or_default();
        let presence = self.presence.lock().map(|p| *p).unwrap_or_default();
        (profile, presence)
    }
}

struct StubState {
    nodes: DashMap<String, Arc<StubNode>>,
    taps: DashMap<String, mpsc::UnboundedSender<Event>>,
    seeds: DashMap<String, Vec<Friend>>,
    channels: DashMap<u32, Arc<StubChannel>>,
    next_stream_id: AtomicU32,
    next_channel_id: AtomicU32,
    next_forwarding_id: AtomicU32,
}

/// Deterministic in-memory engine.
///
/// Cheap to clone; clones share the same in-memory network.
#[derive(Clone)]
pub struct StubEngine {
    state: Arc<StubState>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEngine {
    /// Create an empty in-memory network.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(StubState {
                nodes: DashMap::new(),
                taps: DashMap::new(),
                seeds: DashMap::new(),
                channels: DashMap::new(),
                next_stream_id: AtomicU32::new(1),
                next_channel_id: AtomicU32::new(1),
                next_forwarding_id: AtomicU32::new(1),
            }),
        }
    }

    /// The address the stub assigns to a node name.
    #[must_use]
    pub fn derive_address(name: &str) -> String {
        let mut address = format!("{:Q<52}", format!("WFA{name}"));
        address.truncate(52);
        address
    }

    /// The network id the stub assigns to a node name.
    #[must_use]
    pub fn derive_node_id(name: &str) -> String {
        let mut id = format!("{:0<46}", format!("WFN{name}"));
        id.truncate(46);
        id
    }

    /// Seed a friend reported via `FriendAdded` when `node` attaches.
    ///
    /// Models friends the engine already knows from persistent state.
    pub fn seed_friend(&self, node: &str, friend: Friend) {
        self.state
            .seeds
            .entry(node.to_string())
            .or_default()
            .push(friend);
    }

    /// Inject a raw event into a node's subscription stream.
    pub fn emit(&self, node: &str, event: Event) {
        self.send(node, event);
    }

    fn send(&self, node: &str, event: Event) {
        if let Some(tap) = self.state.taps.get(node) {
            // A dropped receiver is not an engine concern.
            let _ = tap.send(event);
        } else {
            tracing::trace!(node = %node, kind = event.kind().name(), "event without subscriber");
        }
    }

    fn node(&self, name: &str) -> Result<Arc<StubNode>, EngineError> {
        self.state
            .nodes
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::new(ERR_UNKNOWN_NODE, format!("unknown node `{name}`")))
    }

    /// Find a node by its network id, returning `(name, node)`.
    fn node_by_network_id(&self, network_id: &str) -> Option<(String, Arc<StubNode>)> {
        self.state
            .nodes
            .iter()
            .find(|entry| entry.value().node_id == network_id)
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
    }

    fn session_phase(node: &StubNode, friend_id: &str) -> Result<Phase, EngineError> {
        let session = node
            .sessions
            .get(friend_id)
            .ok_or_else(|| EngineError::new(ERR_NO_SESSION, "no session with friend"))?;
        let phase = session.phase.lock().map(|p| *p).unwrap_or(Phase::Closed);
        Ok(phase)
    }

    fn set_session_phase(node: &StubNode, friend_id: &str, phase: Phase) {
        if let Some(session) = node.sessions.get(friend_id) {
            if let Ok(mut slot) = session.phase.lock() {
                *slot = phase;
            }
        }
    }

    fn apply(&self, command: Command) -> Result<Value, EngineError> {
        match command {
            Command::GetVersion => Ok(Value::from(STUB_VERSION)),
            Command::IsValidAddress { address } => {
                Ok(Value::from(address.len() == 52 && address.starts_with("WFA")))
            }
            Command::IsValidId { node_id } => {
                Ok(Value::from(node_id.len() == 46 && node_id.starts_with("WFN")))
            }
            Command::CreateObject { config } => self.create_object(config),
            Command::GetAddress { node } => Ok(Value::from(self.node(&node)?.address.clone())),
            Command::GetNodeId { node } => Ok(Value::from(self.node(&node)?.node_id.clone())),
            Command::GetSelfInfo { node } => {
                let node = self.node(&node)?;
                let profile = node.profile.lock().map(|p| p.clone()).unwrap_or_default();
                serde_json::to_value(profile)
                    .map_err(|e| EngineError::new(ERR_UNKNOWN_NODE, e.to_string()))
            }
            Command::SetSelfInfo { node, info } => {
                let node = self.node(&node)?;
                if let Ok(mut profile) = node.profile.lock() {
                    *profile = info;
                }
                Ok(Value::Null)
            }
            Command::SetSelfPresence { node, presence } => self.set_presence(&node, presence),
            Command::AddFriend {
                node,
                address,
                greeting,
            } => self.add_friend(&node, &address, greeting),
            Command::AcceptFriend { node, user_id } => self.accept_friend(&node, &user_id),
            Command::GetFriendInfo { node, friend_id } => {
                let node = self.node(&node)?;
                let friend = node.friends.get(&friend_id).ok_or_else(|| {
                    EngineError::new(ERR_UNKNOWN_FRIEND, format!("unknown friend `{friend_id}`"))
                })?;
                serde_json::to_value(friend.info.clone())
                    .map_err(|e| EngineError::new(ERR_UNKNOWN_FRIEND, e.to_string()))
            }
            Command::SendFriendMessage {
                node,
                friend_id,
                message,
            } => self.send_message(&node, &friend_id, message),
            Command::RemoveFriend { node, friend_id } => self.remove_friend(&node, &friend_id),
            Command::SetLabel {
                node,
                friend_id,
                label,
            } => {
                let node = self.node(&node)?;
                let mut friend = node.friends.get_mut(&friend_id).ok_or_else(|| {
                    EngineError::new(ERR_UNKNOWN_FRIEND, format!("unknown friend `{friend_id}`"))
                })?;
                friend.label = label;
                Ok(Value::Null)
            }
            Command::GetFriendList { node } => {
                let node = self.node(&node)?;
                let friends: Vec<Friend> =
                    node.friends.iter().map(|entry| entry.value().clone()).collect();
                serde_json::to_value(friends)
                    .map_err(|e| EngineError::new(ERR_UNKNOWN_NODE, e.to_string()))
            }
            Command::Close { node } => self.close(&node),
            Command::Clean { node } => {
                self.state.nodes.remove(&node);
                self.state.seeds.remove(&node);
                Ok(Value::Null)
            }
            Command::CreateSession {
                node,
                friend_id,
                stream_type: _,
                stream_mode: _,
            } => self.create_session(&node, &friend_id),
            Command::SessionRequest { node, friend_id } => self.session_request(&node, &friend_id),
            Command::SessionReplyRequest {
                node,
                friend_id,
                status,
            } => self.session_reply(&node, &friend_id, status),
            Command::WriteStream { node, target, data } => self.write_stream(&node, &target, data),
            Command::RemoveStream { node, friend_id }
            | Command::CloseSession { node, friend_id } => self.close_session(&node, &friend_id),
            Command::AddService {
                node,
                friend_id: _,
                service_name,
                host,
                port,
            } => {
                let node = self.node(&node)?;
                node.services.insert(service_name, (host, port));
                Ok(Value::Null)
            }
            Command::RemoveService {
                node,
                friend_id: _,
                service_name,
            } => {
                let node = self.node(&node)?;
                node.services.remove(&service_name).ok_or_else(|| {
                    EngineError::new(
                        ERR_UNKNOWN_SERVICE,
                        format!("unknown service `{service_name}`"),
                    )
                })?;
                Ok(Value::Null)
            }
            Command::OpenPortForwarding {
                node,
                friend_id,
                service_name,
                host: _,
                port: _,
            } => self.open_forwarding(&node, &friend_id, &service_name),
            Command::ClosePortForwarding {
                node,
                friend_id,
                forwarding_id,
            } => self.close_forwarding(&node, &friend_id, forwarding_id),
            Command::OpenChannel {
                node,
                friend_id,
                cookie: _,
            } => self.open_channel(&node, &friend_id),
            Command::CloseChannel {
                node,
                friend_id,
                channel_id,
            } => self.close_channel(&node, &friend_id, channel_id),
            Command::WriteChannel {
                node,
                friend_id: _,
                channel_id,
                data,
            } => self.write_channel(&node, channel_id, data),
            Command::PendChannel {
                node,
                friend_id: _,
                channel_id,
            } => self.set_channel_pending(&node, channel_id, true),
            Command::ResumeChannel {
                node,
                friend_id: _,
                channel_id,
            } => self.set_channel_pending(&node, channel_id, false),
        }
    }

    fn create_object(&self, config: BootstrapConfig) -> Result<Value, EngineError> {
        let name = config.name.clone();
        let node = self
            .state
            .nodes
            .entry(name.clone())
            .or_insert_with(|| Arc::new(StubNode::new(&name)))
            .clone();
        node.attached.store(true, Ordering::SeqCst);
        tracing::debug!(node = %name, "node attached to stub network");

        // Friends the engine already knows are reported at attach time.
        if let Some((_, seeded)) = self.state.seeds.remove(&name) {
            for friend in seeded {
                node.friends.insert(friend.friend_id.clone(), friend.clone());
                self.send(&name, Event::FriendAdded { friend });
            }
        }
        self.send(
            &name,
            Event::ConnectionStatus {
                status: ConnectionStatus::Connected,
            },
        );
        Ok(Value::Null)
    }

    fn set_presence(&self, name: &str, presence: Presence) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        if let Ok(mut slot) = node.presence.lock() {
            *slot = presence;
        }
        // Everyone holding this node as a friend observes the change.
        let network_id = node.node_id.clone();
        let peers: Vec<String> = self
            .state
            .nodes
            .iter()
            .filter(|entry| entry.value().friends.contains_key(&network_id))
            .map(|entry| entry.key().clone())
            .collect();
        for peer in peers {
            if let Some(node) = self.state.nodes.get(&peer) {
                if let Some(mut friend) = node.friends.get_mut(&network_id) {
                    friend.presence = presence;
                }
            }
            self.send(
                &peer,
                Event::FriendPresence {
                    friend_id: network_id.clone(),
                    presence,
                },
            );
        }
        Ok(Value::Null)
    }

    fn add_friend(
        &self,
        name: &str,
        address: &str,
        greeting: String,
    ) -> Result<Value, EngineError> {
        let requester = self.node(name)?;
        let target = self
            .state
            .nodes
            .iter()
            .find(|entry| entry.value().address == address)
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())));

        // Requests to unknown or detached addresses are still "sent";
        // nothing will ever answer them.
        if let Some((target_name, target_node)) = target {
            if target_node.attached.load(Ordering::SeqCst) {
                let (profile, _) = requester.snapshot_friend();
                target_node.pending.insert(
                    requester.node_id.clone(),
                    PendingRequest {
                        from_node: name.to_string(),
                        greeting: greeting.clone(),
                    },
                );
                self.send(
                    &target_name,
                    Event::FriendRequest {
                        user_id: requester.node_id.clone(),
                        profile,
                        greeting,
                    },
                );
            }
        }
        Ok(Value::Null)
    }

    fn accept_friend(&self, name: &str, user_id: &str) -> Result<Value, EngineError> {
        let acceptor = self.node(name)?;
        let (_, request) = acceptor.pending.remove(user_id).ok_or_else(|| {
            EngineError::new(ERR_NO_PENDING, format!("no pending request from `{user_id}`"))
        })?;
        let requester = self.node(&request.from_node)?;
        tracing::debug!(
            node = %name,
            from = %user_id,
            greeting = %request.greeting,
            "friend request accepted"
        );

        let (req_profile, req_presence) = requester.snapshot_friend();
        let (acc_profile, acc_presence) = acceptor.snapshot_friend();

        acceptor.friends.insert(
            requester.node_id.clone(),
            Friend {
                friend_id: requester.node_id.clone(),
                label: String::new(),
                info: req_profile.clone(),
                presence: req_presence,
            },
        );
        requester.friends.insert(
            acceptor.node_id.clone(),
            Friend {
                friend_id: acceptor.node_id.clone(),
                label: String::new(),
                info: acc_profile.clone(),
                presence: acc_presence,
            },
        );

        self.send(
            name,
            Event::FriendAdded {
                friend: Friend {
                    friend_id: requester.node_id.clone(),
                    label: String::new(),
                    info: req_profile,
                    presence: req_presence,
                },
            },
        );
        self.send(
            &request.from_node,
            Event::FriendAdded {
                friend: Friend {
                    friend_id: acceptor.node_id.clone(),
                    label: String::new(),
                    info: acc_profile,
                    presence: acc_presence,
                },
            },
        );
        Ok(Value::Null)
    }

    fn send_message(
        &self,
        name: &str,
        friend_id: &str,
        message: String,
    ) -> Result<Value, EngineError> {
        let sender = self.node(name)?;
        if !sender.friends.contains_key(friend_id) {
            return Err(EngineError::new(
                ERR_UNKNOWN_FRIEND,
                format!("unknown friend `{friend_id}`"),
            ));
        }
        if let Some((peer_name, _)) = self.node_by_network_id(friend_id) {
            self.send(
                &peer_name,
                Event::FriendMessage {
                    friend_id: sender.node_id.clone(),
                    message,
                },
            );
        }
        Ok(Value::Null)
    }

    fn remove_friend(&self, name: &str, friend_id: &str) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        node.friends.remove(friend_id).ok_or_else(|| {
            EngineError::new(ERR_UNKNOWN_FRIEND, format!("unknown friend `{friend_id}`"))
        })?;
        node.sessions.remove(friend_id);
        if let Some((peer_name, peer)) = self.node_by_network_id(friend_id) {
            peer.friends.remove(&node.node_id);
            peer.sessions.remove(&node.node_id);
            self.send(
                &peer_name,
                Event::FriendRemoved {
                    friend_id: node.node_id.clone(),
                },
            );
        }
        Ok(Value::Null)
    }

    fn close(&self, name: &str) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        node.attached.store(false, Ordering::SeqCst);
        for session in node.sessions.iter() {
            if let Ok(mut phase) = session.phase.lock() {
                *phase = Phase::Closed;
            }
        }
        self.send(
            name,
            Event::ConnectionStatus {
                status: ConnectionStatus::Disconnected,
            },
        );
        Ok(Value::Null)
    }

    fn create_session(&self, name: &str, friend_id: &str) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        if !node.friends.contains_key(friend_id) {
            return Err(EngineError::new(
                ERR_UNKNOWN_FRIEND,
                format!("unknown friend `{friend_id}`"),
            ));
        }
        let stream_id = self.state.next_stream_id.fetch_add(1, Ordering::SeqCst);
        node.sessions.insert(
            friend_id.to_string(),
            StubSession {
                stream_id,
                phase: Mutex::new(Phase::Created),
            },
        );
        Ok(Value::from(stream_id))
    }

    fn session_request(&self, name: &str, friend_id: &str) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        Self::session_phase(&node, friend_id)?;
        Self::set_session_phase(&node, friend_id, Phase::Requested);
        if let Some((peer_name, _)) = self.node_by_network_id(friend_id) {
            self.send(
                &peer_name,
                Event::SessionRequest {
                    friend_id: node.node_id.clone(),
                },
            );
        }
        Ok(Value::Null)
    }

    fn session_reply(
        &self,
        name: &str,
        friend_id: &str,
        status: ReplyStatus,
    ) -> Result<Value, EngineError> {
        let replier = self.node(name)?;
        let peer = self.node_by_network_id(friend_id);
        let accepted = status.is_accepted();

        if let Some((peer_name, peer_node)) = peer {
            // The requester keyed its session by the replier's id.
            let requester_phase = if accepted { Phase::Active } else { Phase::Closed };
            Self::set_session_phase(&peer_node, &replier.node_id, requester_phase);
            self.send(
                &peer_name,
                Event::SessionReply {
                    friend_id: replier.node_id.clone(),
                    status,
                },
            );
            if accepted {
                Self::set_session_phase(&replier, friend_id, Phase::Active);
                self.send(
                    &peer_name,
                    Event::StreamState {
                        friend_id: replier.node_id.clone(),
                        condition: StreamCondition::Connected,
                    },
                );
                self.send(
                    name,
                    Event::StreamState {
                        friend_id: friend_id.to_string(),
                        condition: StreamCondition::Connected,
                    },
                );
            }
        }
        Ok(Value::Null)
    }

    fn write_stream(
        &self,
        name: &str,
        target: &StreamTarget,
        data: Vec<u8>,
    ) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        let friend_id = match target {
            StreamTarget::Friend(friend_id) => friend_id.clone(),
            StreamTarget::Stream(stream_id) => node
                .sessions
                .iter()
                .find(|entry| entry.value().stream_id == *stream_id)
                .map(|entry| entry.key().clone())
                .ok_or_else(|| {
                    EngineError::new(ERR_NO_SESSION, format!("unknown stream `{stream_id}`"))
                })?,
        };
        if Self::session_phase(&node, &friend_id)? != Phase::Active {
            return Err(EngineError::new(ERR_NOT_ACTIVE, "stream not active"));
        }
        if let Some((peer_name, _)) = self.node_by_network_id(&friend_id) {
            self.send(
                &peer_name,
                Event::StreamData {
                    friend_id: node.node_id.clone(),
                    data,
                },
            );
        }
        Ok(Value::Null)
    }

    fn close_session(&self, name: &str, friend_id: &str) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        Self::session_phase(&node, friend_id)?;
        Self::set_session_phase(&node, friend_id, Phase::Closed);
        // Channels between the pair die with the session.
        self.state.channels.retain(|_, channel| {
            !(channel.side_of(name).is_some() && channel.endpoint_ids.contains(&friend_id.to_string()))
        });
        if let Some((peer_name, _)) = self.node_by_network_id(friend_id) {
            self.send(
                &peer_name,
                Event::StreamState {
                    friend_id: node.node_id.clone(),
                    condition: StreamCondition::Closed,
                },
            );
        }
        Ok(Value::Null)
    }

    fn open_forwarding(
        &self,
        name: &str,
        friend_id: &str,
        service_name: &str,
    ) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        if Self::session_phase(&node, friend_id)? != Phase::Active {
            return Err(EngineError::new(ERR_NOT_ACTIVE, "session not active"));
        }
        let (_, peer) = self.node_by_network_id(friend_id).ok_or_else(|| {
            EngineError::new(ERR_UNKNOWN_FRIEND, format!("unknown friend `{friend_id}`"))
        })?;
        if !peer.services.contains_key(service_name) {
            return Err(EngineError::new(
                ERR_UNKNOWN_SERVICE,
                format!("unknown service `{service_name}`"),
            ));
        }
        let forwarding_id = self.state.next_forwarding_id.fetch_add(1, Ordering::SeqCst);
        node.forwardings.insert(forwarding_id, friend_id.to_string());
        self.send(
            name,
            Event::PortForwardingState {
                friend_id: friend_id.to_string(),
                forwarding_id,
                state: ForwardingState::Opened,
            },
        );
        Ok(Value::from(forwarding_id))
    }

    fn close_forwarding(
        &self,
        name: &str,
        friend_id: &str,
        forwarding_id: u32,
    ) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        node.forwardings.remove(&forwarding_id).ok_or_else(|| {
            EngineError::new(
                ERR_UNKNOWN_FORWARDING,
                format!("unknown forwarding `{forwarding_id}`"),
            )
        })?;
        self.send(
            name,
            Event::PortForwardingState {
                friend_id: friend_id.to_string(),
                forwarding_id,
                state: ForwardingState::Closed,
            },
        );
        Ok(Value::Null)
    }

    fn open_channel(&self, name: &str, friend_id: &str) -> Result<Value, EngineError> {
        let node = self.node(name)?;
        if Self::session_phase(&node, friend_id)? != Phase::Active {
            return Err(EngineError::new(ERR_NOT_ACTIVE, "session not active"));
        }
        let (peer_name, peer) = self.node_by_network_id(friend_id).ok_or_else(|| {
            EngineError::new(ERR_UNKNOWN_FRIEND, format!("unknown friend `{friend_id}`"))
        })?;
        let channel_id = self.state.next_channel_id.fetch_add(1, Ordering::SeqCst);
        self.state.channels.insert(
            channel_id,
            Arc::new(StubChannel {
                endpoints: [name.to_string(), peer_name.clone()],
                endpoint_ids: [node.node_id.clone(), peer.node_id.clone()],
                pending: AtomicBool::new(false),
            }),
        );
        self.send(
            &peer_name,
            Event::ChannelOpened {
                friend_id: node.node_id.clone(),
                channel_id,
            },
        );
        Ok(Value::from(channel_id))
    }

    fn channel(&self, node: &str, channel_id: u32) -> Result<(Arc<StubChannel>, usize), EngineError> {
        let channel = self
            .state
            .channels
            .get(&channel_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                EngineError::new(ERR_UNKNOWN_CHANNEL, format!("unknown channel `{channel_id}`"))
            })?;
        let side = channel.side_of(node).ok_or_else(|| {
            EngineError::new(ERR_UNKNOWN_CHANNEL, format!("unknown channel `{channel_id}`"))
        })?;
        Ok((channel, side))
    }

    fn close_channel(
        &self,
        name: &str,
        _friend_id: &str,
        channel_id: u32,
    ) -> Result<Value, EngineError> {
        let (channel, side) = self.channel(name, channel_id)?;
        self.state.channels.remove(&channel_id);
        let other = 1 - side;
        self.send(
            &channel.endpoints[other],
            Event::ChannelClosed {
                friend_id: channel.endpoint_ids[side].clone(),
                channel_id,
            },
        );
        Ok(Value::Null)
    }

    fn write_channel(
        &self,
        name: &str,
        channel_id: u32,
        data: Vec<u8>,
    ) -> Result<Value, EngineError> {
        let (channel, side) = self.channel(name, channel_id)?;
        if channel.pending.load(Ordering::SeqCst) {
            return Err(EngineError::new(ERR_CHANNEL_PENDING, "channel pending"));
        }
        let other = 1 - side;
        self.send(
            &channel.endpoints[other],
            Event::ChannelData {
                friend_id: channel.endpoint_ids[side].clone(),
                channel_id,
                data,
            },
        );
        Ok(Value::Null)
    }

    fn set_channel_pending(
        &self,
        name: &str,
        channel_id: u32,
        pending: bool,
    ) -> Result<Value, EngineError> {
        let (channel, _) = self.channel(name, channel_id)?;
        channel.pending.store(pending, Ordering::SeqCst);
        Ok(Value::Null)
    }
}

impl Engine for StubEngine {
    fn execute(&self, command: Command, mut completion: Completion) {
        let outcome = self.apply(command);
        completion(outcome);
    }

    fn subscribe(&self, node_id: &str) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.taps.insert(node_id.to_string(), tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(engine: &StubEngine, command: Command) -> Result<Value, EngineError> {
        let result = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&result);
        engine.execute(
            command,
            Box::new(move |outcome| {
                *slot.lock().unwrap() = Some(outcome);
            }),
        );
        result.lock().unwrap().take().expect("completion fired")
    }

    fn attach(engine: &StubEngine, name: &str) {
        run(
            engine,
            Command::CreateObject {
                config: BootstrapConfig::for_node(name),
            },
        )
        .unwrap();
    }

    fn befriend(engine: &StubEngine, a: &str, b: &str) {
        run(
            engine,
            Command::AddFriend {
                node: a.into(),
                address: StubEngine::derive_address(b),
                greeting: "hi".into(),
            },
        )
        .unwrap();
        run(
            engine,
            Command::AcceptFriend {
                node: b.into(),
                user_id: StubEngine::derive_node_id(a),
            },
        )
        .unwrap();
    }

    #[test]
    fn derived_identities_pass_validation() {
        let engine = StubEngine::new();
        let address = StubEngine::derive_address("alice");
        let node_id = StubEngine::derive_node_id("alice");
        assert_eq!(run(&engine, Command::IsValidAddress { address }), Ok(Value::from(true)));
        assert_eq!(run(&engine, Command::IsValidId { node_id }), Ok(Value::from(true)));
        assert_eq!(
            run(
                &engine,
                Command::IsValidAddress {
                    address: "nonsense".into()
                }
            ),
            Ok(Value::from(false))
        );
    }

    #[test]
    fn commands_before_attach_fail() {
        let engine = StubEngine::new();
        let err = run(&engine, Command::GetAddress { node: "ghost".into() }).unwrap_err();
        assert_eq!(err.code, ERR_UNKNOWN_NODE);
    }

    #[test]
    fn friendship_is_mutual_after_accept() {
        let engine = StubEngine::new();
        attach(&engine, "alice");
        attach(&engine, "bob");
        befriend(&engine, "alice", "bob");

        let list = run(&engine, Command::GetFriendList { node: "alice".into() }).unwrap();
        let friends: Vec<Friend> = serde_json::from_value(list).unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].friend_id, StubEngine::derive_node_id("bob"));

        let list = run(&engine, Command::GetFriendList { node: "bob".into() }).unwrap();
        let friends: Vec<Friend> = serde_json::from_value(list).unwrap();
        assert_eq!(friends[0].friend_id, StubEngine::derive_node_id("alice"));
    }

    #[test]
    fn accept_without_request_fails() {
        let engine = StubEngine::new();
        attach(&engine, "alice");
        let err = run(
            &engine,
            Command::AcceptFriend {
                node: "alice".into(),
                user_id: StubEngine::derive_node_id("nobody"),
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_NO_PENDING);
    }

    #[test]
    fn write_stream_requires_active_session() {
        let engine = StubEngine::new();
        attach(&engine, "alice");
        attach(&engine, "bob");
        befriend(&engine, "alice", "bob");
        let bob_id = StubEngine::derive_node_id("bob");

        run(
            &engine,
            Command::CreateSession {
                node: "alice".into(),
                friend_id: bob_id.clone(),
                stream_type: crate::types::StreamType::Application,
                stream_mode: crate::types::StreamMode::RELIABLE,
            },
        )
        .unwrap();

        let err = run(
            &engine,
            Command::WriteStream {
                node: "alice".into(),
                target: StreamTarget::Friend(bob_id),
                data: b"early".to_vec(),
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_NOT_ACTIVE);
    }

    #[test]
    fn pending_channel_rejects_writes() {
        let engine = StubEngine::new();
        attach(&engine, "alice");
        attach(&engine, "bob");
        befriend(&engine, "alice", "bob");
        let alice_id = StubEngine::derive_node_id("alice");
        let bob_id = StubEngine::derive_node_id("bob");

        for (node, friend) in [("alice", &bob_id), ("bob", &alice_id)] {
            run(
                &engine,
                Command::CreateSession {
                    node: node.into(),
                    friend_id: friend.clone(),
                    stream_type: crate::types::StreamType::Application,
                    stream_mode: crate::types::StreamMode::RELIABLE
                        | crate::types::StreamMode::MULTIPLEXING,
                },
            )
            .unwrap();
        }
        run(
            &engine,
            Command::SessionRequest {
                node: "alice".into(),
                friend_id: bob_id.clone(),
            },
        )
        .unwrap();
        run(
            &engine,
            Command::SessionReplyRequest {
                node: "bob".into(),
                friend_id: alice_id.clone(),
                status: ReplyStatus::Accepted,
            },
        )
        .unwrap();

        let channel_id = run(
            &engine,
            Command::OpenChannel {
                node: "alice".into(),
                friend_id: bob_id.clone(),
                cookie: "c1".into(),
            },
        )
        .unwrap()
        .as_u64()
        .unwrap() as u32;

        run(
            &engine,
            Command::PendChannel {
                node: "alice".into(),
                friend_id: bob_id.clone(),
                channel_id,
            },
        )
        .unwrap();
        let err = run(
            &engine,
            Command::WriteChannel {
                node: "alice".into(),
                friend_id: bob_id.clone(),
                channel_id,
                data: b"x".to_vec(),
            },
        )
        .unwrap_err();
        assert_eq!(err.code, ERR_CHANNEL_PENDING);

        run(
            &engine,
            Command::ResumeChannel {
                node: "alice".into(),
                friend_id: bob_id.clone(),
                channel_id,
            },
        )
        .unwrap();
        run(
            &engine,
            Command::WriteChannel {
                node: "alice".into(),
                friend_id: bob_id,
                channel_id,
                data: b"x".to_vec(),
            },
        )
        .unwrap();
    }

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let engine = StubEngine::new();
        let mut rx = engine.subscribe("alice");
        for i in 0..3u8 {
            engine.emit(
                "alice",
                Event::FriendMessage {
                    friend_id: "wfn-x".into(),
                    message: format!("m{i}"),
                },
            );
        }
        for i in 0..3u8 {
            match rx.recv().await.unwrap() {
                Event::FriendMessage { message, .. } => assert_eq!(message, format!("m{i}")),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}
