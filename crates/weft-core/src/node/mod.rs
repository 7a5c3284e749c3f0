//! Node orchestration layer.
//!
//! The [`Node`] is the primary entry point for Weft applications. It
//! coordinates the command gateway, the event dispatcher and the
//! per-concern managers:
//! - Identity & presence (`identity`)
//! - Friend relationships (`friends`)
//! - Sessions & streams (`sessions`)
//! - Channels & port forwarding (`channels`)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use weft_core::node::{Callbacks, Node};
//! use weft_engine::{Engine, StubEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine: Arc<dyn Engine> = Arc::new(StubEngine::new());
//!     let node = Node::new("alice", engine, Callbacks::new());
//!     node.start().await?;
//!     println!("address: {}", node.address().await?);
//!     Ok(())
//! }
//! ```

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod friends;
pub mod gateway;
pub mod identity;
#[allow(clippy::module_inception)]
pub mod node;
pub mod sessions;

pub use dispatcher::{Callbacks, Handler};
pub use error::{NodeError, Result};
pub use gateway::CommandGateway;
pub use node::Node;

use serde::de::DeserializeOwned;
use weft_engine::Value;

/// Decode an engine value into the shape a command promises.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| NodeError::Decode(e.to_string()))
}
