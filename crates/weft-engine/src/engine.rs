//! The engine trait: the sole boundary between the coordination layer
//! and the native runtime.

use crate::command::Command;
use crate::error::EngineError;
use crate::event::Event;
use tokio::sync::mpsc;

/// Result value of a command, in the engine's own dynamic shape.
///
/// The engine returns heterogeneous values (strings, booleans, ids,
/// profile records, friend lists); callers decode the shape they expect.
pub type Value = serde_json::Value;

/// Single-shot completion handler for a command.
///
/// The engine invokes the handler exactly once with either the error or
/// the result. The handler is `FnMut` because misbehaving engines have
/// been observed to fire completions twice; the caller guards against
/// duplicate resolution, the type does not.
pub type Completion = Box<dyn FnMut(Result<Value, EngineError>) + Send>;

/// The opaque native runtime.
///
/// Implementations own peer discovery, routing, identity keys and
/// transport; this trait exposes only command execution and per-node
/// event subscription. A single engine handle may serve several node
/// instances: events are demultiplexed by node id at subscription time,
/// so no instance observes another's stream.
pub trait Engine: Send + Sync + 'static {
    /// Execute a command, delivering the outcome through `completion`.
    ///
    /// The call itself never blocks; the completion may fire before
    /// `execute` returns (synchronous engines) or on another task.
    fn execute(&self, command: Command, completion: Completion);

    /// Subscribe to the event stream of one node.
    ///
    /// Events for the node arrive on the returned receiver in emission
    /// order. Subscribing again for the same node id replaces the
    /// previous subscription.
    fn subscribe(&self, node_id: &str) -> mpsc::UnboundedReceiver<Event>;
}
