//! Two-node test fixture.
//!
//! Provides a reusable pair of Weft nodes sharing one stub engine, for
//! testing scenarios that span both sides of a relationship:
//! - friend request / accept flows
//! - session negotiation and stream traffic
//! - channels and port-forwarding tunnels
//!
//! # Example
//!
//! ```no_run
//! use weft_integration_tests::fixtures::TwoNodeFixture;
//!
//! #[tokio::test]
//! async fn test_session() {
//!     let fixture = TwoNodeFixture::new().await.unwrap();
//!     fixture.befriend().await.unwrap();
//!     fixture.establish_session().await.unwrap();
//!     // ... exercise the session ...
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;
use weft_core::node::{Callbacks, Node, NodeError};
use weft_engine::{Engine, ReplyStatus, StreamMode, StreamType, StubEngine};

/// A pair of nodes ("alice" initiates, "bob" responds) on one stub
/// engine.
pub struct TwoNodeFixture {
    /// The shared in-process engine
    pub engine: StubEngine,
    /// Initiating node
    pub initiator: Node,
    /// Responding node
    pub responder: Node,
    /// Initiator's network id
    pub initiator_id: String,
    /// Responder's network id
    pub responder_id: String,
}

impl TwoNodeFixture {
    /// Create and start both nodes with default (logging) callbacks.
    ///
    /// # Errors
    ///
    /// Propagates any engine failure from `start`.
    pub async fn new() -> Result<Self, NodeError> {
        Self::with_callbacks(Callbacks::new(), Callbacks::new()).await
    }

    /// Create and start both nodes with application callbacks.
    ///
    /// # Errors
    ///
    /// Propagates any engine failure from `start`.
    pub async fn with_callbacks(
        initiator_callbacks: Callbacks,
        responder_callbacks: Callbacks,
    ) -> Result<Self, NodeError> {
        let engine = StubEngine::new();
        let handle: Arc<dyn Engine> = Arc::new(engine.clone());
        let initiator = Node::new("alice", Arc::clone(&handle), initiator_callbacks);
        let responder = Node::new("bob", handle, responder_callbacks);
        initiator.start().await?;
        responder.start().await?;
        Ok(Self {
            engine,
            initiator,
            responder,
            initiator_id: StubEngine::derive_node_id("alice"),
            responder_id: StubEngine::derive_node_id("bob"),
        })
    }

    /// Run the request/accept flow so the two nodes are friends.
    ///
    /// # Errors
    ///
    /// Propagates any engine failure.
    pub async fn befriend(&self) -> Result<(), NodeError> {
        self.initiator
            .add_friend(&StubEngine::derive_address("bob"), "hello from alice")
            .await?;
        self.responder.accept_friend(&self.initiator_id).await?;
        Self::settle().await;
        Ok(())
    }

    /// Negotiate an accepted multiplexing session from the initiator.
    ///
    /// # Errors
    ///
    /// Propagates any engine failure.
    pub async fn establish_session(&self) -> Result<(), NodeError> {
        let mode = StreamMode::RELIABLE | StreamMode::MULTIPLEXING | StreamMode::PORT_FORWARDING;
        self.initiator
            .create_session(&self.responder_id, StreamType::Application, mode)
            .await?;
        self.initiator.session_request(&self.responder_id).await?;
        self.responder
            .session_reply_request(&self.initiator_id, ReplyStatus::Accepted)
            .await?;
        Self::settle().await;
        Ok(())
    }

    /// Let the dispatch tasks drain events emitted by the stub.
    pub async fn settle() {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
