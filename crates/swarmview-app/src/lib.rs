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
#![allow(clippy::redundant_pub_crate)]

//! Terminal front-end for a single torrent session.
//!
//! Layout: `bootstrap.rs` (wiring and shutdown), `cli.rs` (flags and env),
//! `engine.rs` (engine child process), `render.rs` (terminal frames),
//! `save.rs` (`.torrent` export),
//! `error.rs` (application failures).

pub mod bootstrap;
pub mod cli;
pub mod engine;
pub mod error;
pub mod render;
pub mod save;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
