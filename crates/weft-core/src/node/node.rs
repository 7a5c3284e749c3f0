//! Node implementation - the per-instance state and facade.
//!
//! The `Node` is the primary entry point for Weft applications. It owns
//! the per-instance maps (friend mirror, sessions, channels, tunnels),
//! shares a stateless command gateway with other instances on the same
//! engine, and runs one dispatch task for its own event stream.

use crate::channel::{Channel, PortForwarding};
use crate::node::dispatcher::{self, Callbacks};
use crate::node::gateway::CommandGateway;
use crate::session::Session;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};
use weft_engine::{BootstrapConfig, Engine, Friend};

/// Node inner state.
///
/// Mutated only by the owning node instance: through the facade methods
/// on one side, and through the dispatch task's event application on the
/// other. Never shared across node instances.
pub(crate) struct NodeInner {
    /// Caller-supplied node id; also the engine subscription key
    pub(crate) id: String,
    /// Bootstrap configuration sent at `start`
    pub(crate) config: BootstrapConfig,
    /// Shared stateless command gateway
    pub(crate) gateway: CommandGateway,
    /// Lazily fetched network address
    pub(crate) address: OnceLock<String>,
    /// Lazily fetched network node id
    pub(crate) network_id: OnceLock<String>,
    /// Friend mirror (friend_id -> Friend)
    pub(crate) friends: DashMap<String, Friend>,
    /// Session descriptors (friend_id -> Session), at most one live each
    pub(crate) sessions: DashMap<String, Session>,
    /// Channel descriptors ((friend_id, channel_id) -> Channel)
    pub(crate) channels: DashMap<(String, u32), Channel>,
    /// Forwarding tunnels (forwarding_id -> PortForwarding)
    pub(crate) forwardings: DashMap<u32, PortForwarding>,
}

/// A Weft client node.
///
/// Cloning is cheap and shares the same instance. Dropping the last
/// clone stops the dispatch task at its next event.
#[derive(Clone)]
pub struct Node {
    pub(crate) inner: Arc<NodeInner>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Constructors
// ═══════════════════════════════════════════════════════════════════════════

impl Node {
    /// Create a node with the default bootstrap configuration.
    ///
    /// Subscribes to the engine's event stream for `id` and spawns the
    /// dispatch task; [`Node::start`] must still be called to attach the
    /// node to the network before friend or session operations.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime (the dispatch task needs
    /// one to be spawned on).
    #[must_use]
    pub fn new(id: impl Into<String>, engine: Arc<dyn Engine>, callbacks: Callbacks) -> Self {
        Self::with_config(id, engine, BootstrapConfig::default(), callbacks)
    }

    /// Create a node with a custom bootstrap configuration.
    ///
    /// An empty `config.name` is filled with the node id.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn with_config(
        id: impl Into<String>,
        engine: Arc<dyn Engine>,
        mut config: BootstrapConfig,
        callbacks: Callbacks,
    ) -> Self {
        let id = id.into();
        if config.name.is_empty() {
            config.name = id.clone();
        }
        let gateway = CommandGateway::new(engine);
        let events = gateway.engine().subscribe(&id);
        let inner = Arc::new(NodeInner {
            id,
            config,
            gateway,
            address: OnceLock::new(),
            network_id: OnceLock::new(),
            friends: DashMap::new(),
            sessions: DashMap::new(),
            channels: DashMap::new(),
            forwardings: DashMap::new(),
        });
        dispatcher::spawn(Arc::downgrade(&inner), callbacks, events);
        Self { inner }
    }

    /// The caller-supplied node id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_engine::StubEngine;

    #[tokio::test]
    async fn config_name_defaults_to_node_id() {
        let engine: Arc<dyn Engine> = Arc::new(StubEngine::new());
        let node = Node::new("alice", engine, Callbacks::new());
        assert_eq!(node.id(), "alice");
        assert_eq!(node.inner.config.name, "alice");
    }

    #[tokio::test]
    async fn explicit_config_name_is_kept() {
        let engine: Arc<dyn Engine> = Arc::new(StubEngine::new());
        let config = BootstrapConfig::for_node("announced-name");
        let node = Node::with_config("alice", engine, config, Callbacks::new());
        assert_eq!(node.id(), "alice");
        assert_eq!(node.inner.config.name, "announced-name");
    }
}
