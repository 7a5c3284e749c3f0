//! Identity & presence management.
//!
//! Static queries (version, address/id validation) are node-independent
//! and delegate entirely to the engine: this layer carries no format
//! rules of its own. Per-node operations cover attaching to the network,
//! identity fields, the profile and presence.

use crate::node::error::Result;
use crate::node::gateway::CommandGateway;
use crate::node::node::Node;
use crate::node::decode;
use std::sync::Arc;
use weft_engine::{Command, Engine, Presence, ProfileUpdate, UserProfile};

// ═══════════════════════════════════════════════════════════════════════════
// Static queries
// ═══════════════════════════════════════════════════════════════════════════

impl Node {
    /// The engine's running version.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn version(engine: &Arc<dyn Engine>) -> Result<String> {
        let gateway = CommandGateway::new(Arc::clone(engine));
        decode(gateway.execute(Command::GetVersion).await?)
    }

    /// Whether `address` is a valid network address per the engine's
    /// format rules.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn is_valid_address(engine: &Arc<dyn Engine>, address: &str) -> Result<bool> {
        let gateway = CommandGateway::new(Arc::clone(engine));
        let value = gateway
            .execute(Command::IsValidAddress {
                address: address.to_string(),
            })
            .await?;
        decode(value)
    }

    /// Whether `node_id` is a valid network node id per the engine's
    /// format rules.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn is_valid_id(engine: &Arc<dyn Engine>, node_id: &str) -> Result<bool> {
        let gateway = CommandGateway::new(Arc::clone(engine));
        let value = gateway
            .execute(Command::IsValidId {
                node_id: node_id.to_string(),
            })
            .await?;
        decode(value)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Identity & presence
// ═══════════════════════════════════════════════════════════════════════════

impl Node {
    /// Attach the node to the network.
    ///
    /// Sends the bootstrap configuration (identity name, UDP flag,
    /// bootstrap peers) to the engine. Must complete before friend or
    /// session operations; no guard is installed here; calling them
    /// earlier is undefined and the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn start(&self) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::CreateObject {
                config: self.inner.config.clone(),
            })
            .await?;
        Ok(())
    }

    /// The node's network address, fetched lazily and cached.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn address(&self) -> Result<String> {
        if let Some(address) = self.inner.address.get() {
            return Ok(address.clone());
        }
        let value = self
            .inner
            .gateway
            .execute(Command::GetAddress {
                node: self.inner.id.clone(),
            })
            .await?;
        let address: String = decode(value)?;
        Ok(self.inner.address.get_or_init(|| address).clone())
    }

    /// The node's network id, fetched lazily and cached.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn node_id(&self) -> Result<String> {
        if let Some(network_id) = self.inner.network_id.get() {
            return Ok(network_id.clone());
        }
        let value = self
            .inner
            .gateway
            .execute(Command::GetNodeId {
                node: self.inner.id.clone(),
            })
            .await?;
        let network_id: String = decode(value)?;
        Ok(self.inner.network_id.get_or_init(|| network_id).clone())
    }

    /// The node's own profile.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn self_info(&self) -> Result<UserProfile> {
        let value = self
            .inner
            .gateway
            .execute(Command::GetSelfInfo {
                node: self.inner.id.clone(),
            })
            .await?;
        decode(value)
    }

    /// Update the node's own profile.
    ///
    /// This is a full replace with defaults, NOT a merge with the stored
    /// profile: fields omitted from `update` revert to the empty string.
    /// The behavior is the engine's accepted call shape and is preserved
    /// deliberately; callers wanting a true merge must read
    /// [`Node::self_info`] first and fill every field.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn set_self_info(&self, update: ProfileUpdate) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::SetSelfInfo {
                node: self.inner.id.clone(),
                info: update.into_profile(),
            })
            .await?;
        Ok(())
    }

    /// Set the node's broadcast presence.
    ///
    /// Presence and profile are orthogonal: this never touches profile
    /// fields.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn set_self_presence(&self, presence: Presence) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::SetSelfPresence {
                node: self.inner.id.clone(),
                presence,
            })
            .await?;
        Ok(())
    }

    /// Detach the node from the network.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn close(&self) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::Close {
                node: self.inner.id.clone(),
            })
            .await?;
        Ok(())
    }

    /// Discard engine-side persistent state for this node id.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure, if any.
    pub async fn clean(&self) -> Result<()> {
        self.inner
            .gateway
            .execute(Command::Clean {
                node: self.inner.id.clone(),
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::dispatcher::Callbacks;
    use weft_engine::StubEngine;

    async fn started_node(name: &str, engine: &Arc<dyn Engine>) -> Node {
        let node = Node::new(name, Arc::clone(engine), Callbacks::new());
        node.start().await.unwrap();
        node
    }

    #[tokio::test]
    async fn static_queries_delegate_to_engine() {
        let engine: Arc<dyn Engine> = Arc::new(StubEngine::new());
        let version = Node::version(&engine).await.unwrap();
        assert_eq!(version, weft_engine::stub::STUB_VERSION);

        let address = StubEngine::derive_address("alice");
        assert!(Node::is_valid_address(&engine, &address).await.unwrap());
        assert!(!Node::is_valid_address(&engine, "garbage").await.unwrap());
        let node_id = StubEngine::derive_node_id("alice");
        assert!(Node::is_valid_id(&engine, &node_id).await.unwrap());
        assert!(!Node::is_valid_id(&engine, "garbage").await.unwrap());
    }

    #[tokio::test]
    async fn identity_fields_match_engine_derivation() {
        let engine: Arc<dyn Engine> = Arc::new(StubEngine::new());
        let node = started_node("alice", &engine).await;
        assert_eq!(node.address().await.unwrap(), StubEngine::derive_address("alice"));
        assert_eq!(node.node_id().await.unwrap(), StubEngine::derive_node_id("alice"));
        // Cached second read.
        assert_eq!(node.address().await.unwrap(), StubEngine::derive_address("alice"));
    }

    #[tokio::test]
    async fn set_self_info_is_full_replace_with_defaults() {
        let engine: Arc<dyn Engine> = Arc::new(StubEngine::new());
        let node = started_node("alice", &engine).await;

        node.set_self_info(ProfileUpdate {
            name: Some("Alice".into()),
            email: Some("alice@example.org".into()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();

        // A second partial update drops the previously set email.
        node.set_self_info(ProfileUpdate {
            name: Some("X".into()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();

        let profile = node.self_info().await.unwrap();
        assert_eq!(profile.name, "X");
        assert_eq!(profile.email, "");
        assert_eq!(profile.gender, "");
        assert_eq!(profile.region, "");
        assert_eq!(profile.phone, "");
        assert_eq!(profile.description, "");
    }

    #[tokio::test]
    async fn presence_is_orthogonal_to_profile() {
        let engine: Arc<dyn Engine> = Arc::new(StubEngine::new());
        let node = started_node("alice", &engine).await;
        node.set_self_info(ProfileUpdate {
            name: Some("Alice".into()),
            ..ProfileUpdate::default()
        })
        .await
        .unwrap();

        for presence in [Presence::Online, Presence::Away, Presence::Busy] {
            node.set_self_presence(presence).await.unwrap();
            let profile = node.self_info().await.unwrap();
            assert_eq!(profile.name, "Alice");
            assert_eq!(profile.description, "");
        }
    }
}
