//! Event dispatcher: fixed-catalog routing to per-node callbacks.
//!
//! A node subscribes once for its own event stream at construction and
//! runs one dispatch task for the life of the instance. Each event is
//! first applied to the node's internal bookkeeping (friend mirror,
//! session and channel state machines), then handed to the registered
//! application handler, or to the default handler, which only logs and
//! never panics.
//!
//! Handlers run synchronously on the dispatch task: delivery for one
//! node preserves the engine's emission order per event kind, and the
//! dispatcher does not await handler completion against the engine.

use crate::node::node::NodeInner;
use std::collections::HashMap;
use std::sync::Weak;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use weft_engine::{Event, EventKind};

/// An application event handler.
pub type Handler = Box<dyn Fn(&Event) + Send + Sync>;

/// Per-node callback registry.
///
/// Maps event kinds from the fixed catalog to handlers. Kinds without a
/// registered handler resolve to the default logging handler at dispatch
/// time. The registry is immutable once the node is constructed.
///
/// # Example
///
/// ```
/// use weft_core::node::Callbacks;
/// use weft_engine::{Event, EventKind};
///
/// let callbacks = Callbacks::new().on(EventKind::FriendMessage, |event| {
///     if let Event::FriendMessage { friend_id, message } = event {
///         println!("{friend_id}: {message}");
///     }
/// });
/// assert!(callbacks.is_registered(EventKind::FriendMessage));
/// assert!(!callbacks.is_registered(EventKind::FriendAdded));
/// ```
#[derive(Default)]
pub struct Callbacks {
    handlers: HashMap<EventKind, Handler>,
}

impl Callbacks {
    /// Create an empty registry; every kind falls back to the default
    /// logging handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind, replacing any previous one.
    #[must_use]
    pub fn on<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Whether an application handler is registered for `kind`.
    #[must_use]
    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    fn resolve(&self, kind: EventKind) -> Option<&Handler> {
        self.handlers.get(&kind)
    }
}

/// The default handler: observability only, never panics.
fn default_handler(event: &Event) {
    tracing::debug!(
        event = event.kind().name(),
        payload = ?event,
        "engine event with no registered handler"
    );
}

/// Spawn the dispatch task for one node.
///
/// The task holds only a weak reference to the node: when the node is
/// dropped, dispatch stops at the next event instead of keeping the
/// state alive.
pub(crate) fn spawn(
    inner: Weak<NodeInner>,
    callbacks: Callbacks,
    mut events: mpsc::UnboundedReceiver<Event>,
) -> JoinHandle<()> {
    // The node subscribes to the whole fixed catalog exactly once;
    // record which kinds resolve to application handlers.
    for kind in EventKind::all() {
        tracing::trace!(
            event = kind.name(),
            registered = callbacks.is_registered(kind),
            "event kind subscribed"
        );
    }
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            // Bookkeeping first, so handlers observe updated state.
            inner.apply(&event);
            match callbacks.resolve(event.kind()) {
                Some(handler) => handler(&event),
                None => default_handler(&event),
            }
        }
        tracing::debug!("event stream ended, dispatch task exiting");
    })
}

impl NodeInner {
    /// Apply an event to the node's internal maps before user dispatch.
    pub(crate) fn apply(&self, event: &Event) {
        match event {
            Event::FriendAdded { .. }
            | Event::FriendRemoved { .. }
            | Event::FriendPresence { .. } => self.apply_friend_event(event),
            Event::SessionReply { .. } => self.apply_session_event(event),
            Event::ChannelOpened { .. }
            | Event::ChannelClosed { .. }
            | Event::PortForwardingState { .. } => self.apply_channel_event(event),
            // Pass-through kinds carry no state this layer tracks.
            _ => {}
        }
    }
}
