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

//! Remote-session bridge between the UI process and the torrent engine.
//!
//! The client correlates outbound commands with inbound responses by token,
//! fans engine events out to per-torrent and client-level subscribers, and
//! keeps a registry of the torrent handles it has handed out.
//! Layout: `client.rs` (correlation and routing), `handle.rs` (torrent proxy),
//! `pending.rs` (correlation table), `transport.rs` (outbound sink),
//! `subscription.rs` (event streams), `error.rs` (bridge failures).

pub mod client;
pub mod error;
pub mod handle;
mod pending;
pub mod subscription;
pub mod transport;

pub use client::{ClientEvent, RemoteClient, with_timeout};
pub use error::{RemoteError, RemoteResult, TransportError};
pub use handle::{TorrentEvent, TorrentHandle};
pub use pending::Operation;
pub use subscription::Subscription;
pub use transport::{ChannelTransport, Transport};
