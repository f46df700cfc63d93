//! Session tuning knobs.

use std::time::Duration;

use swarmview_protocol::AddOptions;

use crate::error::{SessionError, SessionResult};

/// Default refresh cadence for the view.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
/// Default grace period handed to the engine on destroy.
pub const DEFAULT_DESTROY_GRACE: Duration = Duration::from_millis(1_000);

/// Configuration for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Period of the refresh loop.
    pub refresh_interval: Duration,
    /// Grace period sent with the destroy command.
    pub destroy_grace: Duration,
    /// Optional deadline for `get` and `add`. `None` waits for the engine.
    pub command_timeout: Option<Duration>,
    /// Options sent with `add` when the user starts the torrent.
    pub add_options: AddOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            destroy_grace: DEFAULT_DESTROY_GRACE,
            command_timeout: None,
            add_options: AddOptions::engine_managed(),
        }
    }
}

impl SessionConfig {
    /// Check the configuration for values the session cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] for a zero refresh interval or a
    /// zero command timeout.
    pub fn validate(&self) -> SessionResult<()> {
        if self.refresh_interval.is_zero() {
            return Err(SessionError::InvalidConfig {
                field: "refresh_interval",
                reason: "must be greater than zero",
            });
        }
        if self.command_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(SessionError::InvalidConfig {
                field: "command_timeout",
                reason: "must be greater than zero when set",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SessionConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(1));
        assert_eq!(config.destroy_grace, Duration::from_millis(1_000));
        assert_eq!(config.command_timeout, None);
        assert_eq!(config.add_options, AddOptions::engine_managed());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_durations_are_rejected() {
        let config = SessionConfig {
            refresh_interval: Duration::ZERO,
            ..SessionConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SessionError::InvalidConfig {
                field: "refresh_interval",
                reason: "must be greater than zero",
            })
        );

        let config = SessionConfig {
            command_timeout: Some(Duration::ZERO),
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidConfig {
                field: "command_timeout",
                ..
            })
        ));
    }
}
