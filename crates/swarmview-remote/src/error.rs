//! # Design
//!
//! - Bridge failures are values: every pending command resolves to one of these.
//! - Keep error messages constant; the engine's own wording lives in a field.
//! - Errors are `Clone` so a single outcome can be fanned out to the state
//!   machine and to logs.

use std::time::Duration;

use thiserror::Error;

/// Result alias for remote-session operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failures surfaced by the remote-session client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The engine does not know the requested torrent.
    #[error("torrent not found")]
    NotFound {
        /// Identifier that was probed.
        torrent_id: String,
    },
    /// The engine rejected or failed the command.
    #[error("engine operation failed")]
    Engine {
        /// Command that failed.
        operation: &'static str,
        /// Torrent targeted by the command, when any.
        torrent_id: Option<String>,
        /// Engine-provided description.
        message: String,
    },
    /// The transport closed before the command could complete.
    #[error("engine channel closed")]
    ChannelClosed {
        /// Command that was in flight or attempted.
        operation: &'static str,
    },
    /// A call-site deadline expired while waiting for the engine.
    #[error("engine operation timed out")]
    TimedOut {
        /// Command that was awaited.
        operation: &'static str,
        /// Deadline that expired.
        after: Duration,
    },
}

impl RemoteError {
    /// Text suitable for a user-facing banner.
    ///
    /// Engine failures carry the engine's own wording; every other variant
    /// falls back to its constant description.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Engine { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this is the expected "torrent absent" probe outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the transport is gone.
    #[must_use]
    pub const fn is_channel_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed { .. })
    }
}

/// Failure reported by a [`crate::Transport`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer end of the channel is gone.
    #[error("transport closed")]
    Closed,
}
