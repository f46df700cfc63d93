//! Engine event and torrent snapshot payloads.

use serde::{Deserialize, Serialize};

/// Unsolicited notifications pushed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Non-fatal condition worth logging.
    Warning {
        /// Engine-provided description.
        message: String,
    },
    /// Fault affecting the addressed torrent or client.
    Error {
        /// Engine-provided description.
        message: String,
    },
    /// Periodic refresh of torrent progress and peer metadata.
    Progress {
        /// Latest engine-side view of the torrent.
        snapshot: TorrentSnapshot,
    },
}

impl EngineEvent {
    /// Machine-friendly discriminator for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Warning { .. } => "warning",
            Self::Error { .. } => "error",
            Self::Progress { .. } => "progress",
        }
    }
}

/// Engine-owned metadata about a torrent, as last reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TorrentSnapshot {
    /// Display name once metadata is known.
    pub name: Option<String>,
    /// Info hash reported by the engine.
    pub info_hash: Option<String>,
    /// Byte-level progress.
    pub progress: TorrentProgress,
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Current upload rate in bytes per second.
    pub upload_bps: u64,
    /// Number of connected peers.
    pub num_peers: u32,
    /// Whether every selected piece has been verified.
    pub done: bool,
    /// Files contained in the torrent, empty until metadata arrives.
    pub files: Vec<TorrentFile>,
}

/// Byte counters for a torrent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TorrentProgress {
    /// Bytes verified so far.
    pub bytes_downloaded: u64,
    /// Total bytes selected for download.
    pub bytes_total: u64,
}

impl TorrentProgress {
    /// Completion ratio expressed as a percentage.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn percent_complete(&self) -> f64 {
        if self.bytes_total == 0 {
            0.0
        } else {
            (self.bytes_downloaded as f64 / self.bytes_total as f64) * 100.0
        }
    }
}

/// Single file inside a torrent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TorrentFile {
    /// File name without directories.
    pub name: String,
    /// Path relative to the torrent root.
    pub path: String,
    /// Size in bytes.
    pub length: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn percent_complete_handles_empty_totals() {
        assert!(TorrentProgress::default().percent_complete().abs() < f64::EPSILON);
        let half = TorrentProgress {
            bytes_downloaded: 512,
            bytes_total: 1_024,
        };
        assert!((half.percent_complete() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_tolerates_sparse_payloads() -> anyhow::Result<()> {
        let snapshot: TorrentSnapshot = serde_json::from_value(json!({
            "name": "Movie",
            "numPeers": 3,
            "progress": { "bytesDownloaded": 10 },
        }))?;
        assert_eq!(snapshot.name.as_deref(), Some("Movie"));
        assert_eq!(snapshot.num_peers, 3);
        assert_eq!(snapshot.progress.bytes_downloaded, 10);
        assert_eq!(snapshot.progress.bytes_total, 0);
        assert!(snapshot.files.is_empty());
        Ok(())
    }

    #[test]
    fn events_are_tagged_by_kind() -> anyhow::Result<()> {
        let event: EngineEvent = serde_json::from_value(json!({
            "kind": "error",
            "message": "disk full",
        }))?;
        assert_eq!(
            event,
            EngineEvent::Error {
                message: "disk full".into()
            }
        );
        assert_eq!(event.kind(), "error");
        Ok(())
    }
}
