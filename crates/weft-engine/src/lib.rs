//! # Weft Engine
//!
//! The engine boundary of the Weft client node. The engine is the opaque
//! native runtime that owns peer discovery, routing, identity keys and
//! transport sockets; this crate defines the surface the coordination
//! layer talks to:
//!
//! - The typed command catalog ([`Command`]) with the engine wire names
//! - The typed event catalog ([`Event`] / [`EventKind`])
//! - The [`Engine`] trait (command execution + per-node event subscription)
//! - [`EngineError`], the opaque failure type surfaced by commands
//! - Bootstrap configuration ([`BootstrapConfig`])
//! - An in-process [`StubEngine`] with deterministic semantics, used by
//!   the test suites and by applications that want a local engine
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Coordination layer                        │
//! │          (weft-core: gateway, dispatcher, managers)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      Engine trait                            │
//! │        execute(Command, completion)  ·  subscribe(node)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │              Native engine  /  StubEngine                    │
//! │        (DHT, NAT traversal, crypto, transport)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod stub;
pub mod types;

pub use command::{Command, StreamTarget};
pub use config::{BootstrapConfig, BootstrapPeer};
pub use engine::{Completion, Engine, Value};
pub use error::EngineError;
pub use event::{Event, EventKind};
pub use stub::StubEngine;
pub use types::{
    ConnectionStatus, ForwardingState, Friend, Presence, ProfileUpdate, ReplyStatus,
    StreamCondition, StreamMode, StreamType, UserProfile,
};
