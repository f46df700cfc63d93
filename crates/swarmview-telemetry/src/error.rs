//! Failures raised while installing logging or handling bridge metrics.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Telemetry failures. Messages are constant; context lives in the fields.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A log format name was not recognised.
    #[error("unknown log format")]
    UnknownLogFormat {
        /// Value supplied by the caller.
        value: String,
    },
    /// A bridge collector could not be built.
    #[error("failed to build metrics collector")]
    MetricsCollector {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// A bridge collector could not be registered.
    #[error("failed to register metrics collector")]
    MetricsRegister {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The text exposition could not be encoded.
    #[error("failed to encode metrics")]
    MetricsEncode {
        /// Underlying Prometheus error.
        source: PrometheusError,
    },
    /// The encoded exposition was not UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8 {
        /// Underlying conversion error.
        source: std::string::FromUtf8Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_stay_constant_while_context_varies() {
        let bad_utf8 = String::from_utf8(vec![0xff, 0xfe]).err();
        let mut cases = vec![
            (
                TelemetryError::UnknownLogFormat {
                    value: "yaml".into(),
                },
                "unknown log format",
                false,
            ),
            (
                TelemetryError::MetricsRegister {
                    name: "bridge_events_total",
                    source: PrometheusError::AlreadyReg,
                },
                "failed to register metrics collector",
                true,
            ),
            (
                TelemetryError::MetricsEncode {
                    source: PrometheusError::Msg("broken family".into()),
                },
                "failed to encode metrics",
                true,
            ),
        ];
        if let Some(source) = bad_utf8 {
            cases.push((
                TelemetryError::MetricsUtf8 { source },
                "metrics output was not valid utf-8",
                true,
            ));
        }
        for (err, message, has_source) in cases {
            assert_eq!(err.to_string(), message);
            assert_eq!(err.source().is_some(), has_source);
        }
    }

    #[test]
    fn registering_a_collector_twice_is_reported_by_name() {
        let registry = prometheus::Registry::new();
        let gauge = prometheus::IntGauge::new("bridge_pending_commands", "pending")
            .map_err(|source| TelemetryError::MetricsCollector {
                name: "bridge_pending_commands",
                source,
            });
        let Ok(gauge) = gauge else {
            panic!("gauge options are valid");
        };
        assert!(registry.register(Box::new(gauge.clone())).is_ok());
        let err = registry
            .register(Box::new(gauge))
            .map_err(|source| TelemetryError::MetricsRegister {
                name: "bridge_pending_commands",
                source,
            });
        assert!(matches!(
            err,
            Err(TelemetryError::MetricsRegister {
                name: "bridge_pending_commands",
                ..
            })
        ));
    }
}
