//! Error type surfaced by engine commands.

use thiserror::Error;

/// An opaque failure reported by the engine for a command.
///
/// The engine distinguishes invalid arguments, unknown peers, network
/// failures and internal faults only through its own code space; this
/// layer surfaces the payload verbatim and never interprets it. Callers
/// that need finer handling match on `code`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("engine error {code}: {message}")]
pub struct EngineError {
    /// Engine-specific error code
    pub code: i32,
    /// Human-readable message from the engine
    pub message: String,
}

impl EngineError {
    /// Synthesized when the engine drops a completion callback without
    /// invoking it. Real engine codes are non-negative.
    pub const COMPLETION_DROPPED: i32 = -1;

    /// Create an error with an engine code and message.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error for a command whose completion was dropped unfired.
    #[must_use]
    pub fn completion_dropped(command: &str) -> Self {
        Self {
            code: Self::COMPLETION_DROPPED,
            message: format!("completion dropped for command `{command}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_code_and_message() {
        let err = EngineError::new(4, "unknown friend");
        assert_eq!(err.to_string(), "engine error 4: unknown friend");
    }

    #[test]
    fn dropped_completion_uses_reserved_code() {
        let err = EngineError::completion_dropped("addFriend");
        assert_eq!(err.code, EngineError::COMPLETION_DROPPED);
        assert!(err.message.contains("addFriend"));
    }
}
