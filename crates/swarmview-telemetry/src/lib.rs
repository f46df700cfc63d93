#![forbid(unsafe_code)]
#![warn(
    unused,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Telemetry primitives shared across the swarmview workspace.
//!
//! This crate centralises logging setup and the bridge metrics registry so the
//! session library and the binary agree on one observability story.
//! Layout: `init.rs` (tracing subscriber), `metrics.rs` (Prometheus registry),
//! `error.rs` (telemetry failures).

pub mod error;
pub mod init;
pub mod metrics;

pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
pub use metrics::{Metrics, MetricsSnapshot};
