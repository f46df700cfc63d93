//! Command-line and environment configuration.

use std::time::Duration;

use clap::Parser;
use swarmview_session::{SessionConfig, SessionError};
use swarmview_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig};

use crate::error::{AppError, AppResult};

const DEFAULT_REFRESH_MS: u64 = 1_000;
const DEFAULT_DESTROY_GRACE_MS: u64 = 1_000;

/// Watch a single torrent through an out-of-process engine.
#[derive(Debug, Parser)]
#[command(name = "swarmview", version)]
pub struct Cli {
    /// Magnet URI or bare info hash of the torrent to show.
    #[arg(env = "SWARMVIEW_TORRENT_ID")]
    pub identifier: String,
    /// Engine executable speaking line-delimited JSON over stdio.
    #[arg(long, env = "SWARMVIEW_ENGINE_CMD")]
    pub engine_cmd: String,
    /// Extra argument passed to the engine; repeatable.
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,
    /// View refresh period in milliseconds.
    #[arg(long, env = "SWARMVIEW_REFRESH_MS", default_value_t = DEFAULT_REFRESH_MS)]
    pub refresh_ms: u64,
    /// Grace period handed to the engine on exit, in milliseconds.
    #[arg(long, env = "SWARMVIEW_DESTROY_GRACE_MS", default_value_t = DEFAULT_DESTROY_GRACE_MS)]
    pub destroy_grace_ms: u64,
    /// Deadline for engine probes and joins, in milliseconds. Unset waits forever.
    #[arg(long, env = "SWARMVIEW_COMMAND_TIMEOUT_MS")]
    pub command_timeout_ms: Option<u64>,
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, env = "SWARMVIEW_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
    /// Log output format: json, pretty or compact.
    #[arg(long, env = "SWARMVIEW_LOG_FORMAT")]
    pub log_format: Option<String>,
}

impl Cli {
    /// Session settings derived from the command line.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidConfig`] when a value is out of range.
    pub fn session_config(&self) -> AppResult<SessionConfig> {
        let config = SessionConfig {
            refresh_interval: Duration::from_millis(self.refresh_ms),
            destroy_grace: Duration::from_millis(self.destroy_grace_ms),
            command_timeout: self.command_timeout_ms.map(Duration::from_millis),
            ..SessionConfig::default()
        };
        config.validate().map_err(|err| match err {
            SessionError::InvalidConfig { field, reason } => AppError::InvalidConfig {
                field,
                reason,
                value: Some(self.raw_value(field)),
            },
            other => AppError::session("session.config", other),
        })?;
        Ok(config)
    }

    /// Logging settings derived from the command line.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidConfig`] for an unknown log format.
    pub fn logging_config(&self) -> AppResult<LoggingConfig> {
        let format = match self.log_format.as_deref() {
            None => LogFormat::infer(),
            Some(value) => value
                .parse::<LogFormat>()
                .map_err(|_| AppError::InvalidConfig {
                    field: "log_format",
                    reason: "unknown log format",
                    value: Some(value.to_owned()),
                })?,
        };
        Ok(LoggingConfig {
            level: self.log_level.clone(),
            format,
        })
    }

    fn raw_value(&self, field: &str) -> String {
        match field {
            "refresh_interval" => self.refresh_ms.to_string(),
            "command_timeout" => self
                .command_timeout_ms
                .map(|value| value.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Cli> {
        let mut argv = vec!["swarmview"];
        argv.extend_from_slice(args);
        Ok(Cli::try_parse_from(argv)?)
    }

    #[test]
    fn defaults_produce_the_documented_session_config() -> anyhow::Result<()> {
        let cli = parse(&[
            "--engine-cmd",
            "engine",
            "magnet:?xt=urn:btih:AAA&dn=Movie",
        ])?;
        let config = cli.session_config()?;
        assert_eq!(config, SessionConfig::default());
        assert_eq!(cli.identifier, "magnet:?xt=urn:btih:AAA&dn=Movie");
        assert!(cli.engine_args.is_empty());
        Ok(())
    }

    #[test]
    fn overrides_flow_into_session_config() -> anyhow::Result<()> {
        let cli = parse(&[
            "--engine-cmd",
            "node",
            "--engine-arg",
            "engine.js",
            "--engine-arg",
            "--verbose",
            "--refresh-ms",
            "250",
            "--destroy-grace-ms",
            "0",
            "--command-timeout-ms",
            "5000",
            "c12fe1c06bba254a9dc9f519b335aa7c1367a88a",
        ])?;
        let config = cli.session_config()?;
        assert_eq!(config.refresh_interval, Duration::from_millis(250));
        assert_eq!(config.destroy_grace, Duration::ZERO);
        assert_eq!(config.command_timeout, Some(Duration::from_secs(5)));
        assert_eq!(cli.engine_args, vec!["engine.js", "--verbose"]);
        Ok(())
    }

    #[test]
    fn zero_refresh_is_invalid_config() -> anyhow::Result<()> {
        let cli = parse(&["--engine-cmd", "engine", "--refresh-ms", "0", "abc"])?;
        match cli.session_config() {
            Err(AppError::InvalidConfig { field, value, .. }) => {
                assert_eq!(field, "refresh_interval");
                assert_eq!(value.as_deref(), Some("0"));
            }
            other => panic!("expected invalid config, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn log_format_is_validated() -> anyhow::Result<()> {
        let cli = parse(&["--engine-cmd", "engine", "--log-format", "json", "abc"])?;
        assert_eq!(cli.logging_config()?.format, LogFormat::Json);
        assert_eq!(cli.logging_config()?.level, DEFAULT_LOG_LEVEL);

        let cli = parse(&["--engine-cmd", "engine", "--log-format", "xml", "abc"])?;
        assert!(matches!(
            cli.logging_config(),
            Err(AppError::InvalidConfig {
                field: "log_format",
                ..
            })
        ));
        Ok(())
    }
}
