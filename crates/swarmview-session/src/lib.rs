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
#![allow(clippy::redundant_pub_crate, clippy::module_name_repetitions)]

//! Single-torrent session controller.
//!
//! A session probes the engine for one torrent, waits for an explicit start
//! when the engine does not run it, tracks faults without dropping the handle,
//! and re-renders one of two views on a fixed cadence until it is closed.
//! Layout: `descriptor.rs` (identifier parsing), `state.rs` (phases and derived
//! output), `controller.rs` (transitions), `session.rs` (actor loop and
//! handle), `refresh.rs` (re-render timer), `view.rs` (view selection and the
//! renderer seam), `export.rs` (`.torrent` export), `config.rs`, `error.rs`.

pub mod config;
mod controller;
pub mod descriptor;
pub mod error;
pub mod export;
mod refresh;
pub mod session;
pub mod state;
pub mod view;

pub use config::{DEFAULT_DESTROY_GRACE, DEFAULT_REFRESH_INTERVAL, SessionConfig};
pub use descriptor::{DescriptorError, ParsedDescriptor, parse_descriptor};
pub use error::{SessionError, SessionErrorKind, SessionResult};
pub use export::{ExportError, TorrentFileExport, export_torrent_file};
pub use session::{Session, SessionHandle};
pub use state::{SessionOutput, SessionPhase, SessionState};
pub use view::{Renderer, View, select_view};
