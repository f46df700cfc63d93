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

//! Wire protocol spoken between the UI-side session client and the torrent
//! engine process.
//!
//! Layout: `message.rs` (envelope, correlation tokens, command set),
//! `payloads.rs` (engine events and torrent snapshots), `codec.rs`
//! (line-delimited JSON framing), `error.rs` (codec failures).

pub mod codec;
pub mod error;
pub mod message;
pub mod payloads;

pub use codec::{decode_line, encode_line};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    AddOptions, Command, CommandToken, DestroyOptions, Message, WireError, WireErrorKind,
};
pub use payloads::{EngineEvent, TorrentFile, TorrentProgress, TorrentSnapshot};
