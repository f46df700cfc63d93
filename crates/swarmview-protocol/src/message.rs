//! Message envelope and command definitions.
//!
//! # Design
//! - Commands carry a correlation token; responses echo it back verbatim.
//! - Events carry a target torrent identifier and never a token.
//! - Engine options stay opaque so new engine features pass through untouched.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::payloads::{EngineEvent, TorrentSnapshot};

/// Correlation token generated by the client for every outbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandToken(Uuid);

impl CommandToken {
    /// Generate a fresh random token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing identifier, mostly useful for fixtures.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying identifier.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CommandToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CommandToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, formatter)
    }
}

/// Envelope exchanged over the transport channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Message {
    /// Client → engine request awaiting exactly one response.
    Command {
        /// Correlation token echoed by the response.
        token: CommandToken,
        /// Requested operation.
        command: Command,
    },
    /// Engine → client answer to a previously issued command.
    Response {
        /// Token of the command being answered.
        token: CommandToken,
        /// Torrent state when the command produced one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<TorrentSnapshot>,
        /// Failure details when the command did not succeed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<WireError>,
    },
    /// Unsolicited engine notification.
    Event {
        /// Target torrent; `None` addresses the client as a whole.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        torrent_id: Option<String>,
        /// Event body.
        event: EngineEvent,
    },
}

impl Message {
    /// Build a command envelope with a fresh token.
    #[must_use]
    pub fn command(command: Command) -> Self {
        Self::Command {
            token: CommandToken::new(),
            command,
        }
    }

    /// Build a successful response.
    #[must_use]
    pub const fn success(token: CommandToken, payload: Option<TorrentSnapshot>) -> Self {
        Self::Response {
            token,
            payload,
            error: None,
        }
    }

    /// Build a failed response.
    #[must_use]
    pub const fn failure(token: CommandToken, error: WireError) -> Self {
        Self::Response {
            token,
            payload: None,
            error: Some(error),
        }
    }

    /// Build an event addressed to a torrent, or to the whole client when `torrent_id` is `None`.
    #[must_use]
    pub fn event(torrent_id: Option<&str>, event: EngineEvent) -> Self {
        Self::Event {
            torrent_id: torrent_id.map(str::to_owned),
            event,
        }
    }

    /// Machine-friendly discriminator used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Response { .. } => "response",
            Self::Event { .. } => "event",
        }
    }
}

/// Commands understood by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Command {
    /// Look up a torrent the engine is already running. Never creates one.
    Get {
        /// Opaque torrent identifier.
        torrent_id: String,
    },
    /// Join the swarm for a torrent, creating it in the engine if needed.
    Add {
        /// Opaque torrent identifier.
        torrent_id: String,
        /// Engine-specific options passed through unchanged.
        #[serde(default)]
        options: AddOptions,
    },
    /// Release the client's resources after the given grace period.
    Destroy {
        /// Milliseconds the engine should wait before releasing resources.
        #[serde(default)]
        delay_ms: u64,
    },
}

impl Command {
    /// Command name as it appears on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "get",
            Self::Add { .. } => "add",
            Self::Destroy { .. } => "destroy",
        }
    }

    /// Torrent targeted by the command, if any.
    #[must_use]
    pub fn torrent_id(&self) -> Option<&str> {
        match self {
            Self::Get { torrent_id } | Self::Add { torrent_id, .. } => Some(torrent_id),
            Self::Destroy { .. } => None,
        }
    }
}

/// Options forwarded to the engine when adding a torrent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddOptions {
    /// Server-side placement hints. An empty object lets the engine decide
    /// transport and seeding mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<Value>,
    /// Any further engine options, passed through as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AddOptions {
    /// Let the engine choose transport and seeding behaviour (`{"server": {}}`).
    #[must_use]
    pub fn engine_managed() -> Self {
        Self {
            server: Some(Value::Object(Map::new())),
            extra: Map::new(),
        }
    }

    /// Attach an extra engine option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Teardown hints sent with the destroy command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestroyOptions {
    /// Grace period, in milliseconds, before the engine releases resources.
    pub delay_ms: u64,
}

impl DestroyOptions {
    /// Build options from a grace duration, saturating at `u64::MAX` milliseconds.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl From<DestroyOptions> for Command {
    fn from(options: DestroyOptions) -> Self {
        Self::Destroy {
            delay_ms: options.delay_ms,
        }
    }
}

/// Failure reported by the engine in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    /// Failure classification.
    pub kind: WireErrorKind,
    /// Human-readable detail from the engine.
    #[serde(default)]
    pub message: String,
}

impl WireError {
    /// Torrent is not known to the engine.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: WireErrorKind::NotFound,
            message: message.into(),
        }
    }

    /// Command failed inside the engine.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: WireErrorKind::Failed,
            message: message.into(),
        }
    }
}

/// Coarse failure classes understood by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireErrorKind {
    /// The torrent does not exist in the engine.
    NotFound,
    /// Any other engine failure.
    #[serde(other)]
    Failed,
}
