//! `.torrent` export built from what the identifier carries.
//!
//! A magnet link has no info dictionary, so the file holds the tracker list
//! only; clients fetch the metadata from the swarm.

use serde::Serialize;
use thiserror::Error;

use crate::descriptor::ParsedDescriptor;

const CREATED_BY: &str = "swarmview";
const FALLBACK_STEM: &str = "torrent";

/// Encoded torrent file and the name to save it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFileExport {
    /// `<name>.torrent`, falling back to the info hash.
    pub file_name: String,
    /// Bencoded file contents.
    pub bytes: Vec<u8>,
}

/// Failures while building a torrent file.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Bencoding the metadata failed.
    #[error("failed to encode torrent file")]
    Encode {
        /// Underlying bencode error.
        source: serde_bencode::Error,
    },
}

#[derive(Serialize)]
struct TorrentFileMeta<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    announce: Option<&'a str>,
    #[serde(rename = "announce-list", skip_serializing_if = "Vec::is_empty")]
    announce_list: Vec<Vec<&'a str>>,
    #[serde(rename = "created by")]
    created_by: &'static str,
}

/// Build the `.torrent` file for `descriptor`.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the metadata cannot be bencoded.
pub fn export_torrent_file(
    descriptor: &ParsedDescriptor,
) -> Result<TorrentFileExport, ExportError> {
    let meta = TorrentFileMeta {
        announce: descriptor.trackers.first().map(String::as_str),
        announce_list: descriptor
            .trackers
            .iter()
            .map(|tracker| vec![tracker.as_str()])
            .collect(),
        created_by: CREATED_BY,
    };
    let bytes =
        serde_bencode::to_bytes(&meta).map_err(|source| ExportError::Encode { source })?;
    Ok(TorrentFileExport {
        file_name: file_name(descriptor),
        bytes,
    })
}

fn file_name(descriptor: &ParsedDescriptor) -> String {
    let stem = descriptor
        .name
        .as_deref()
        .map(sanitize)
        .filter(|name| !name.is_empty())
        .or_else(|| descriptor.info_hash.clone())
        .unwrap_or_else(|| FALLBACK_STEM.to_owned());
    format!("{stem}.torrent")
}

// Keep the name inside the target directory.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    cleaned.trim_matches(|ch: char| ch == '.' || ch.is_whitespace()).to_owned()
}
