//! # Design
//!
//! - Centralize application-level errors for bootstrap and shutdown.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration values were invalid.
    #[error("invalid configuration")]
    InvalidConfig {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Optional value associated with the failure.
        value: Option<String>,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: swarmview_telemetry::TelemetryError,
    },
    /// Session operations failed.
    #[error("session operation failed")]
    Session {
        /// Operation identifier.
        operation: &'static str,
        /// Source session error.
        source: swarmview_session::SessionError,
    },
    /// The engine process could not be started.
    #[error("failed to spawn engine process")]
    EngineSpawn {
        /// Program that was launched.
        command: String,
        /// Source IO error.
        source: io::Error,
    },
    /// The identifier could not be turned into a torrent file.
    #[error("torrent identifier is malformed")]
    Descriptor {
        /// Source parse error.
        source: swarmview_session::DescriptorError,
    },
    /// Building the torrent file failed.
    #[error("failed to build torrent file")]
    Export {
        /// Source export error.
        source: swarmview_session::ExportError,
    },
    /// Writing the torrent file failed.
    #[error("failed to save torrent file")]
    SaveTorrent {
        /// Destination path.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Talking to or supervising the engine process failed.
    #[error("engine process io failed")]
    EngineIo {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn telemetry(
        operation: &'static str,
        source: swarmview_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn session(
        operation: &'static str,
        source: swarmview_session::SessionError,
    ) -> Self {
        Self::Session { operation, source }
    }

    pub(crate) const fn engine_io(operation: &'static str, source: io::Error) -> Self {
        Self::EngineIo { operation, source }
    }
}
