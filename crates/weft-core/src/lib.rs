//! # Weft Core
//!
//! Coordination layer of the Weft client node. Sits between application
//! code and the opaque engine (`weft-engine`), providing:
//!
//! - The [`Node`] facade: identity, presence, friends, messaging
//! - Session negotiation and the session state machine
//! - Sub-channel and port-forwarding management
//! - The command gateway (async command execution with single-shot
//!   completion correlation)
//! - The event dispatcher (fixed catalog, per-node callback registry
//!   with a default logging handler)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Application                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                       Node facade                            │
//! │   Identity │ Friends │ Sessions/Streams │ Channels/Tunnels  │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │        Command gateway        │       Event dispatcher       │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                     Engine (weft-engine)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod error;
pub mod node;
pub mod session;

pub use channel::{Channel, ChannelState, PortForwarding};
pub use error::{ChannelError, SessionError};
pub use node::{Callbacks, CommandGateway, Node, NodeError};
pub use session::{Session, SessionState};
