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

//! Shared test helpers used across integration suites.
//! Layout: engine.rs (scripted engine over the channel transport), render.rs
//! (recording renderer).

pub mod engine;
pub mod render;

pub use engine::{COMMAND_WAIT, EngineHarness, snapshot_named};
pub use render::{Frame, RecordingRenderer};
