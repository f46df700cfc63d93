//! Plain-text terminal renderer.

use std::fmt::Write as _;
use std::io::{self, Write};

use swarmview_protocol::TorrentSnapshot;
use swarmview_session::{Renderer, SessionErrorKind, SessionOutput, View};
use tracing::warn;

/// Writes one status block per frame to the wrapped writer.
pub struct TerminalRenderer<W: Write + Send + 'static> {
    out: W,
    failed: bool,
}

impl TerminalRenderer<io::Stdout> {
    /// Renderer bound to the process stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + 'static> TerminalRenderer<W> {
    /// Wrap an arbitrary writer.
    pub const fn new(out: W) -> Self {
        Self { out, failed: false }
    }

    /// Recover the writer, mainly for inspection in tests.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> Renderer for TerminalRenderer<W> {
    fn render(&mut self, output: &SessionOutput, view: &View) {
        let frame = format_view(output, view);
        let written = self
            .out
            .write_all(frame.as_bytes())
            .and_then(|()| self.out.flush());
        match written {
            Ok(()) => self.failed = false,
            // Only report the first failure of a streak.
            Err(err) if !self.failed => {
                self.failed = true;
                warn!(error = %err, "failed to write frame");
            }
            Err(_) => {}
        }
    }
}

/// Text block describing `view`.
#[must_use]
pub fn format_view(output: &SessionOutput, view: &View) -> String {
    let mut text = String::new();
    let title = view.title().unwrap_or(output.identifier.as_str());
    let _ = writeln!(text, "== {title} [{}]", output.phase);

    match view {
        View::Media {
            torrent,
            file_index,
            ..
        } => {
            let snapshot = torrent.snapshot();
            match snapshot.files.get(*file_index) {
                Some(file) => {
                    let _ = writeln!(text, "playing #{file_index}: {}", file.path);
                }
                None => {
                    let _ = writeln!(text, "playing #{file_index}: (metadata pending)");
                }
            }
            text.push_str(&format_snapshot(&snapshot));
        }
        View::Browser {
            identifier,
            torrent,
            error_message,
            can_start,
            ..
        } => {
            if view.title().is_some() {
                let _ = writeln!(text, "id: {identifier}");
            }
            if let Some(torrent) = torrent {
                text.push_str(&format_snapshot(&torrent.snapshot()));
            }
            if let Some(message) = error_message {
                let _ = writeln!(text, "error: {message}");
            }
            if *can_start {
                text.push_str("press 's' + enter to start\n");
            }
            if output.error_kind != Some(SessionErrorKind::MalformedIdentifier) {
                text.push_str("press 'w' + enter to save a .torrent file\n");
            }
        }
    }
    text
}

/// Progress, rate and peer lines for a snapshot.
#[must_use]
pub fn format_snapshot(snapshot: &TorrentSnapshot) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "progress: {:.1}%{}",
        snapshot.progress.percent_complete(),
        if snapshot.done { " (done)" } else { "" }
    );
    let _ = writeln!(
        text,
        "down: {}/s  up: {}/s  peers: {}",
        human_bytes(snapshot.download_bps),
        human_bytes(snapshot.upload_bps),
        snapshot.num_peers
    );
    text
}

#[allow(clippy::cast_precision_loss)]
fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmview_protocol::TorrentProgress;
    use swarmview_session::{SessionPhase, select_view};

    fn output(name: Option<&str>, error: Option<&str>, can_start: bool) -> SessionOutput {
        SessionOutput {
            identifier: "magnet:?xt=urn:btih:AAA".into(),
            name: name.map(str::to_owned),
            torrent: None,
            error_message: error.map(str::to_owned),
            error_kind: None,
            selected_file_index: None,
            phase: if can_start {
                SessionPhase::Absent
            } else {
                SessionPhase::Probing
            },
            can_start,
        }
    }

    #[test]
    fn browser_shows_error_and_start_hint() {
        let output = output(Some("Movie"), Some("refused"), true);
        let text = format_view(&output, &select_view(&output));
        assert!(text.starts_with("== Movie [absent]\n"));
        assert!(text.contains("id: magnet:?xt=urn:btih:AAA\n"));
        assert!(text.contains("error: refused\n"));
        assert!(text.contains("press 's'"));
    }

    #[test]
    fn untitled_browser_falls_back_to_identifier() {
        let output = output(None, None, false);
        let text = format_view(&output, &select_view(&output));
        assert_eq!(
            text,
            "== magnet:?xt=urn:btih:AAA [probing]\npress 'w' + enter to save a .torrent file\n"
        );
    }

    #[test]
    fn malformed_identifier_offers_no_save() {
        let mut output = output(None, Some("malformed identifier: identifier is empty"), false);
        output.error_kind = Some(SessionErrorKind::MalformedIdentifier);
        let text = format_view(&output, &select_view(&output));
        assert!(text.contains("error: malformed identifier"));
        assert!(!text.contains("save"));
    }

    #[test]
    fn snapshot_lines_scale_rates() {
        let snapshot = TorrentSnapshot {
            progress: TorrentProgress {
                bytes_downloaded: 50,
                bytes_total: 200,
            },
            download_bps: 1536,
            upload_bps: 512,
            num_peers: 7,
            ..TorrentSnapshot::default()
        };
        assert_eq!(
            format_snapshot(&snapshot),
            "progress: 25.0%\ndown: 1.5 KiB/s  up: 512 B/s  peers: 7\n"
        );
    }

    #[test]
    fn human_bytes_climbs_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(1024), "1.0 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn renderer_writes_each_frame() {
        let output = output(Some("Movie"), None, false);
        let view = select_view(&output);
        let mut renderer = TerminalRenderer::new(Vec::new());
        renderer.render(&output, &view);
        renderer.render(&output, &view);
        let written = String::from_utf8(renderer.into_inner()).unwrap_or_default();
        assert_eq!(written.matches("== Movie [probing]").count(), 2);
    }
}
