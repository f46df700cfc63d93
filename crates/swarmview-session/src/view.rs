//! View selection and the renderer seam.

use swarmview_remote::TorrentHandle;

use crate::state::SessionOutput;

/// The two screens a session can show.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// Player for one file inside a joined torrent.
    Media {
        /// Display name, used as the title.
        name: Option<String>,
        /// Joined torrent.
        torrent: TorrentHandle,
        /// File selected by the identifier.
        file_index: usize,
    },
    /// Torrent overview with status, errors and the start action.
    Browser {
        /// Display name, used as the title.
        name: Option<String>,
        /// Identifier as supplied.
        identifier: String,
        /// Joined torrent, if any.
        torrent: Option<TorrentHandle>,
        /// Error banner text.
        error_message: Option<String>,
        /// Whether the start action is offered.
        can_start: bool,
    },
}

impl View {
    /// Whether this is the media player.
    #[must_use]
    pub const fn is_media(&self) -> bool {
        matches!(self, Self::Media { .. })
    }

    /// Title for the hosting window or terminal.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Media { name, .. } | Self::Browser { name, .. } => name.as_deref(),
        }
    }

    /// Torrent shown by the view, if any.
    #[must_use]
    pub const fn torrent(&self) -> Option<&TorrentHandle> {
        match self {
            Self::Media { torrent, .. } => Some(torrent),
            Self::Browser { torrent, .. } => torrent.as_ref(),
        }
    }
}

/// Map the session output to the view to display.
///
/// The media view needs both a handle and a selected file; everything else
/// lands on the browser.
#[must_use]
pub fn select_view(output: &SessionOutput) -> View {
    match (&output.torrent, output.selected_file_index) {
        (Some(torrent), Some(file_index)) => View::Media {
            name: output.name.clone(),
            torrent: torrent.clone(),
            file_index,
        },
        _ => View::Browser {
            name: output.name.clone(),
            identifier: output.identifier.clone(),
            torrent: output.torrent.clone(),
            error_message: output.error_message.clone(),
            can_start: output.can_start,
        },
    }
}

/// Sink for derived views. Called from the session task on every tick and
/// state transition; must not block.
pub trait Renderer: Send + 'static {
    /// Present `view`, derived from `output`.
    fn render(&mut self, output: &SessionOutput, view: &View);
}
