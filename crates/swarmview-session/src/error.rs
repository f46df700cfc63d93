//! # Design
//!
//! - `SessionErrorKind` classifies failures recorded in session state; those
//!   never escape to the host, they are rendered.
//! - `SessionError` covers the few control-surface failures a caller can see.

use thiserror::Error;

/// Result alias for session control operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by the session control surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A configuration value was rejected.
    #[error("invalid session configuration")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// Static reason describing the problem.
        reason: &'static str,
    },
    /// The session has already ended.
    #[error("session terminated")]
    Terminated,
}

/// Classification of the error currently recorded in session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// The identifier could not be parsed; no command is ever sent.
    MalformedIdentifier,
    /// The probe failed for a reason other than "not found".
    ProbeFailed,
    /// The engine refused to add the torrent.
    JoinFailed,
    /// The attached torrent reported a fault; the handle is kept.
    TorrentFault,
    /// The engine reported a client-wide fault.
    EngineFault,
    /// The engine channel closed under a pending command.
    ChannelClosed,
}

impl SessionErrorKind {
    /// Label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedIdentifier => "malformed_identifier",
            Self::ProbeFailed => "probe_failed",
            Self::JoinFailed => "join_failed",
            Self::TorrentFault => "torrent_fault",
            Self::EngineFault => "engine_fault",
            Self::ChannelClosed => "channel_closed",
        }
    }

    /// Whether a start attempt may follow this failure.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::MalformedIdentifier)
    }
}
