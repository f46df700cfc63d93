//! Prometheus-backed counters for the remote-session bridge.

use std::sync::Arc;

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Metrics registry shared by the bridge client and the host binary.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    commands_total: IntCounterVec,
    responses_total: IntCounterVec,
    events_total: IntCounterVec,
    dropped_messages_total: IntCounterVec,
    pending_commands: IntGauge,
}

/// Point-in-time view of the bridge gauges and counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Commands currently awaiting a response.
    pub pending_commands: i64,
    /// Commands sent, summed over all command names.
    pub commands_total: u64,
    /// Responses matched to a pending command.
    pub responses_total: u64,
    /// Inbound events routed to a subscriber list.
    pub events_total: u64,
    /// Inbound messages dropped for any reason.
    pub dropped_messages_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the bridge collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let commands_total = counter_vec(
            "bridge_commands_total",
            "Commands sent to the engine by name",
            &["command"],
        )?;
        let responses_total = counter_vec(
            "bridge_responses_total",
            "Responses matched to pending commands by outcome",
            &["outcome"],
        )?;
        let events_total = counter_vec(
            "bridge_events_total",
            "Engine events routed to subscribers by kind",
            &["kind"],
        )?;
        let dropped_messages_total = counter_vec(
            "bridge_dropped_messages_total",
            "Inbound messages dropped by reason",
            &["reason"],
        )?;
        let pending_commands = IntGauge::with_opts(Opts::new(
            "bridge_pending_commands",
            "Commands awaiting an engine response",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "bridge_pending_commands",
            source,
        })?;

        register(&registry, "bridge_commands_total", &commands_total)?;
        register(&registry, "bridge_responses_total", &responses_total)?;
        register(&registry, "bridge_events_total", &events_total)?;
        register(
            &registry,
            "bridge_dropped_messages_total",
            &dropped_messages_total,
        )?;
        register(&registry, "bridge_pending_commands", &pending_commands)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                commands_total,
                responses_total,
                events_total,
                dropped_messages_total,
                pending_commands,
            }),
        })
    }

    /// Increment the sent-command counter.
    pub fn inc_command(&self, command: &str) {
        self.inner
            .commands_total
            .with_label_values(&[command])
            .inc();
    }

    /// Increment the matched-response counter for an outcome label.
    pub fn inc_response(&self, outcome: &str) {
        self.inner
            .responses_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the routed-event counter.
    pub fn inc_event(&self, kind: &str) {
        self.inner.events_total.with_label_values(&[kind]).inc();
    }

    /// Increment the dropped-message counter.
    pub fn inc_dropped(&self, reason: &str) {
        self.inner
            .dropped_messages_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Set the pending-command gauge.
    pub fn set_pending_commands(&self, count: usize) {
        self.inner
            .pending_commands
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the bridge counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pending_commands: self.inner.pending_commands.get(),
            commands_total: sum(&self.inner.commands_total),
            responses_total: sum(&self.inner.responses_total),
            events_total: sum(&self.inner.events_total),
            dropped_messages_total: sum(&self.inner.dropped_messages_total),
        }
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

fn sum(counter: &IntCounterVec) -> u64 {
    use prometheus::core::Collector;

    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric().iter())
        .map(|metric| {
            let value = metric.get_counter().value();
            if value.is_sign_negative() {
                0
            } else {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let whole = value as u64;
                whole
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshot() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_command("get");
        metrics.inc_command("add");
        metrics.inc_response("ok");
        metrics.inc_event("warning");
        metrics.inc_dropped("unknown_token");
        metrics.inc_dropped("unknown_torrent");
        metrics.set_pending_commands(1);

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            MetricsSnapshot {
                pending_commands: 1,
                commands_total: 2,
                responses_total: 1,
                events_total: 1,
                dropped_messages_total: 2,
            }
        );
        Ok(())
    }

    #[test]
    fn render_emits_text_exposition() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_command("destroy");
        let rendered = metrics.render()?;
        assert!(rendered.contains("bridge_commands_total{command=\"destroy\"} 1"));
        assert!(rendered.contains("bridge_pending_commands 0"));
        Ok(())
    }

    #[test]
    fn snapshot_serialises_for_diagnostics() -> Result<()> {
        let metrics = Metrics::new()?;
        let value = serde_json::to_value(metrics.snapshot()).unwrap_or_default();
        assert_eq!(value["pending_commands"], 0);
        Ok(())
    }
}
