//! The closed error taxonomy at the engine boundary (spec §7).
//!
//! Every public operation returns a value or one of these variants — no
//! exceptions cross the boundary. Internal invariant violations that
//! cannot be meaningfully recovered from (a broken FFT precondition after
//! internal validation already passed) are still allowed to panic; this
//! enum covers the errors callers are expected to handle.

use thiserror::Error;

/// Engine-boundary error taxonomy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Caller-supplied value out of range (non-positive sample rate, empty
    /// buffer where forbidden, etc).
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Session id unknown or already destroyed.
    #[error("invalid or unknown session id: {0}")]
    InvalidSession(u64),

    /// Master-call audio or feature file missing or unreadable.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Recording or feature file could not be persisted.
    #[error("failed to write file: {0}")]
    FileWriteError(String),

    /// Appending a chunk would exceed the session's configured
    /// `max_buffer_size`; the chunk is rejected and the session left
    /// unchanged.
    #[error("buffer overflow: appending {attempted} samples would exceed max of {max}")]
    BufferOverflow {
        /// Samples the caller attempted to append.
        attempted: usize,
        /// The session's configured ceiling.
        max: usize,
    },

    /// Similarity requested when either side has no features, or an
    /// analyzer requested over a window shorter than it requires.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Internal numerical or configuration failure.
    #[error("processing error: {0}")]
    ProcessingError(String),

    /// External recorder collaborator failed to initialize; surfaced
    /// unchanged from the host.
    #[error("recorder initialization failed: {0}")]
    RecorderInitFailed(String),

    /// External player collaborator was used before initialization;
    /// surfaced unchanged from the host.
    #[error("player not initialized")]
    PlayerNotInitialized,
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_overflow_carries_both_counts() {
        let err = EngineError::BufferOverflow {
            attempted: 10,
            max: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains('1'));
        assert!(msg.contains('8'));
    }
}
