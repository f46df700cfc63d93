//! Saving the torrent identifier as a `.torrent` file.

use std::path::{Path, PathBuf};

use swarmview_session::{export_torrent_file, parse_descriptor};

use crate::error::{AppError, AppResult};

/// Write `<name>.torrent` for `identifier` into `dir` and return its path.
///
/// # Errors
///
/// Returns [`AppError::Descriptor`] for a malformed identifier,
/// [`AppError::Export`] if encoding fails and [`AppError::SaveTorrent`] if the
/// file cannot be written.
pub async fn save_torrent_file(identifier: &str, dir: &Path) -> AppResult<PathBuf> {
    let descriptor =
        parse_descriptor(identifier).map_err(|source| AppError::Descriptor { source })?;
    let export = export_torrent_file(&descriptor).map_err(|source| AppError::Export { source })?;
    let path = dir.join(&export.file_name);
    tokio::fs::write(&path, &export.bytes)
        .await
        .map_err(|source| AppError::SaveTorrent {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("swarmview-{label}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn writes_named_file_into_directory() -> anyhow::Result<()> {
        let dir = scratch_dir("save");
        tokio::fs::create_dir_all(&dir).await?;

        let path = save_torrent_file("magnet:?xt=urn:btih:AAA&dn=Movie", &dir).await?;
        assert_eq!(path, dir.join("Movie.torrent"));
        let bytes = tokio::fs::read(&path).await?;
        assert!(bytes.starts_with(b"d"));
        assert!(bytes.ends_with(b"9:swarmviewe"));

        tokio::fs::remove_dir_all(&dir).await?;
        Ok(())
    }

    #[tokio::test]
    async fn malformed_identifier_writes_nothing() {
        let dir = scratch_dir("save-malformed");
        let outcome = save_torrent_file("not a magnet", &dir).await;
        assert!(matches!(outcome, Err(AppError::Descriptor { .. })));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn missing_directory_reports_the_path() {
        let dir = scratch_dir("save-missing").join("absent");
        match save_torrent_file("magnet:?xt=urn:btih:AAA", &dir).await {
            Err(AppError::SaveTorrent { path, .. }) => {
                assert_eq!(path, dir.join("aaa.torrent"));
            }
            other => panic!("expected save failure, got {other:?}"),
        }
    }
}
