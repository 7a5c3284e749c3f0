//! Command gateway: async command execution against the engine.
//!
//! Every engine command ultimately resolves through a single-shot
//! completion callback. The gateway bridges that callback onto a
//! `tokio::sync::oneshot` channel so callers can simply `.await` the
//! outcome, and guarantees at-most-one resolution per invocation even
//! when an engine misfires the completion twice.

use std::sync::Arc;
use tokio::sync::oneshot;
use weft_engine::{Command, Engine, EngineError, Value};

/// Stateless gateway issuing commands to the engine.
///
/// Cheap to clone and shared across all node instances using the same
/// engine handle. Concurrent `execute` calls are independent and
/// unordered relative to each other; the gateway never retries: retry
/// policy, if any, belongs to the caller.
#[derive(Clone)]
pub struct CommandGateway {
    engine: Arc<dyn Engine>,
}

impl CommandGateway {
    /// Create a gateway over an engine handle.
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// The underlying engine handle.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Execute a command and await its single completion.
    ///
    /// Engine failures surface verbatim as [`EngineError`]. A duplicate
    /// completion from the engine is discarded, not an error; a dropped
    /// completion resolves to [`EngineError::completion_dropped`].
    /// Command name and outcome are logged best-effort.
    ///
    /// # Errors
    ///
    /// Returns the engine's error payload for the command, unmodified.
    pub async fn execute(&self, command: Command) -> Result<Value, EngineError> {
        let name = command.name();
        tracing::debug!(command = name, "issuing engine command");

        let (tx, rx) = oneshot::channel();
        let mut slot = Some(tx);
        self.engine.execute(
            command,
            Box::new(move |outcome| match slot.take() {
                Some(tx) => {
                    // A caller that stopped awaiting is not an error.
                    let _ = tx.send(outcome);
                }
                None => {
                    tracing::debug!(command = name, "duplicate completion discarded");
                }
            }),
        );

        match rx.await {
            Ok(Ok(value)) => {
                tracing::debug!(command = name, result = %value, "engine command completed");
                Ok(value)
            }
            Ok(Err(error)) => {
                tracing::debug!(command = name, error = %error, "engine command failed");
                Err(error)
            }
            Err(_) => {
                tracing::debug!(command = name, "engine dropped completion");
                Err(EngineError::completion_dropped(name))
            }
        }
    }
}
