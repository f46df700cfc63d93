//! Session state owned by the controller and the output derived from it.

use std::fmt::{self, Display, Formatter};

use swarmview_remote::{Operation, TorrentHandle};

use crate::descriptor::ParsedDescriptor;
use crate::error::SessionErrorKind;

/// Lifecycle phases of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Created, identifier not parsed yet.
    Idle,
    /// `get` in flight.
    Probing,
    /// The engine does not run the torrent; waiting for an explicit start.
    Absent,
    /// `add` in flight.
    Starting,
    /// A handle is attached.
    Joined,
    /// An error is recorded. A handle may still be attached.
    Errored,
    /// Destroy issued; no further transitions.
    Destroying,
    /// Session over.
    Terminated,
}

impl SessionPhase {
    /// Label used in logs and the terminal view.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::Absent => "absent",
            Self::Starting => "starting",
            Self::Joined => "joined",
            Self::Errored => "errored",
            Self::Destroying => "destroying",
            Self::Terminated => "terminated",
        }
    }

    /// Whether the session is shutting down or gone.
    #[must_use]
    pub const fn is_closing(self) -> bool {
        matches!(self, Self::Destroying | Self::Terminated)
    }
}

impl Display for SessionPhase {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Mutable state of a single session.
#[derive(Debug, Clone)]
pub struct SessionState {
    identifier: String,
    descriptor: Option<ParsedDescriptor>,
    torrent: Option<TorrentHandle>,
    error_message: Option<String>,
    error_kind: Option<SessionErrorKind>,
    phase: SessionPhase,
    in_flight: Option<Operation>,
}

impl SessionState {
    /// Fresh state for `identifier` with no handle and no error.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            descriptor: None,
            torrent: None,
            error_message: None,
            error_kind: None,
            phase: SessionPhase::Idle,
            in_flight: None,
        }
    }

    /// Identifier as supplied at session start.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Parsed descriptor, absent when the identifier is malformed.
    #[must_use]
    pub const fn descriptor(&self) -> Option<&ParsedDescriptor> {
        self.descriptor.as_ref()
    }

    /// Attached torrent handle, if any.
    #[must_use]
    pub const fn torrent(&self) -> Option<&TorrentHandle> {
        self.torrent.as_ref()
    }

    /// Recorded error message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Classification of the recorded error.
    #[must_use]
    pub const fn error_kind(&self) -> Option<SessionErrorKind> {
        self.error_kind
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Engine command awaiting its response, independent of the phase.
    #[must_use]
    pub const fn in_flight(&self) -> Option<Operation> {
        self.in_flight
    }

    /// Whether an explicit start would be accepted now.
    ///
    /// Start needs a parsed identifier, no handle and no outstanding command,
    /// and is offered from `Absent` or from a retryable `Errored`.
    #[must_use]
    pub fn can_start(&self) -> bool {
        if self.descriptor.is_none() || self.torrent.is_some() || self.in_flight.is_some() {
            return false;
        }
        match self.phase {
            SessionPhase::Absent => true,
            SessionPhase::Errored => self.error_kind.is_none_or(SessionErrorKind::is_retryable),
            _ => false,
        }
    }

    pub(crate) fn set_descriptor(&mut self, descriptor: ParsedDescriptor) {
        self.descriptor = Some(descriptor);
    }

    pub(crate) const fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    pub(crate) const fn begin_command(&mut self, operation: Operation) {
        self.in_flight = Some(operation);
    }

    /// Clear the outstanding command if it is `operation`. Returns `false`
    /// for a result nobody is waiting on.
    pub(crate) fn finish_command(&mut self, operation: Operation) -> bool {
        if self.in_flight == Some(operation) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Record an error and move to `Errored`. A held handle is kept.
    pub(crate) fn record_error(&mut self, kind: SessionErrorKind, message: impl Into<String>) {
        self.error_kind = Some(kind);
        self.error_message = Some(message.into());
        self.phase = SessionPhase::Errored;
    }

    /// Attach a handle, clear any prior error, and move to `Joined`.
    pub(crate) fn attach(&mut self, handle: TorrentHandle) {
        self.torrent = Some(handle);
        self.error_kind = None;
        self.error_message = None;
        self.phase = SessionPhase::Joined;
    }

    /// Attach a handle found by the probe. An error recorded while the probe
    /// was outstanding stays, and so does `Errored`.
    pub(crate) fn adopt(&mut self, handle: TorrentHandle) {
        self.torrent = Some(handle);
        if self.error_message.is_none() {
            self.phase = SessionPhase::Joined;
        }
    }

    /// Derive the output handed to the renderer and published to observers.
    #[must_use]
    pub fn output(&self) -> SessionOutput {
        let descriptor_name = self.descriptor.as_ref().and_then(|d| d.name.clone());
        let name = descriptor_name.or_else(|| {
            self.torrent
                .as_ref()
                .and_then(|handle| handle.snapshot().name)
        });
        SessionOutput {
            identifier: self.identifier.clone(),
            name,
            torrent: self.torrent.clone(),
            error_message: self.error_message.clone(),
            error_kind: self.error_kind,
            selected_file_index: self
                .descriptor
                .as_ref()
                .and_then(|d| d.selected_file_index),
            phase: self.phase,
            can_start: self.can_start(),
        }
    }
}

/// Snapshot of everything the view needs, recomputed on every tick and
/// transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutput {
    /// Identifier as supplied.
    pub identifier: String,
    /// Display name from the identifier, else from engine metadata.
    pub name: Option<String>,
    /// Attached handle.
    pub torrent: Option<TorrentHandle>,
    /// Recorded error message.
    pub error_message: Option<String>,
    /// Classification of the recorded error.
    pub error_kind: Option<SessionErrorKind>,
    /// File index selected by the identifier.
    pub selected_file_index: Option<usize>,
    /// Current phase.
    pub phase: SessionPhase,
    /// Whether the start action should be offered.
    pub can_start: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::parse_descriptor;
    use swarmview_protocol::{Message, TorrentSnapshot};
    use swarmview_remote::{ChannelTransport, RemoteClient};

    fn parsed(identifier: &str) -> SessionState {
        let mut state = SessionState::new(identifier);
        state.set_descriptor(parse_descriptor(identifier).expect("valid identifier"));
        state
    }

    #[test]
    fn start_is_offered_when_absent_or_retryable() {
        let mut state = parsed("magnet:?xt=urn:btih:AAA&dn=Movie");
        assert!(!state.can_start());

        state.set_phase(SessionPhase::Absent);
        assert!(state.can_start());

        state.record_error(SessionErrorKind::JoinFailed, "refused");
        assert_eq!(state.phase(), SessionPhase::Errored);
        assert!(state.can_start());

        state.set_phase(SessionPhase::Destroying);
        assert!(!state.can_start());
    }

    #[test]
    fn malformed_identifiers_never_offer_start() {
        let mut state = SessionState::new("nope");
        state.record_error(SessionErrorKind::MalformedIdentifier, "malformed identifier");
        assert!(!state.can_start());
        let output = state.output();
        assert_eq!(output.error_message.as_deref(), Some("malformed identifier"));
        assert_eq!(output.name, None);
        assert_eq!(output.selected_file_index, None);
    }

    #[test]
    fn output_reflects_descriptor_fields() {
        let mut state = parsed("magnet:?xt=urn:btih:AAA&dn=Movie&ix=0");
        state.set_phase(SessionPhase::Absent);
        let output = state.output();
        assert_eq!(output.identifier, "magnet:?xt=urn:btih:AAA&dn=Movie&ix=0");
        assert_eq!(output.name.as_deref(), Some("Movie"));
        assert_eq!(output.selected_file_index, Some(0));
        assert_eq!(output.phase, SessionPhase::Absent);
        assert!(output.can_start);
        assert!(output.torrent.is_none());
    }

    #[test]
    fn outstanding_command_blocks_start_and_stale_results() {
        let mut state = parsed("magnet:?xt=urn:btih:AAA&dn=Movie");
        state.set_phase(SessionPhase::Probing);
        state.begin_command(Operation::Get);
        state.record_error(SessionErrorKind::EngineFault, "tracker down");
        assert!(!state.can_start());
        assert_eq!(state.in_flight(), Some(Operation::Get));

        assert!(!state.finish_command(Operation::Add));
        assert!(state.finish_command(Operation::Get));
        assert!(!state.finish_command(Operation::Get));
        assert!(state.can_start());
    }

    async fn found_handle() -> TorrentHandle {
        let (transport, mut outbound) = ChannelTransport::new();
        let client = RemoteClient::new(transport);
        let lookup = tokio::spawn({
            let client = client.clone();
            async move { client.get("abc").await }
        });
        let Some(Message::Command { token, .. }) = outbound.recv().await else {
            panic!("expected a get command");
        };
        client.receive(Message::success(token, Some(TorrentSnapshot::default())));
        lookup.await.expect("lookup task").expect("lookup resolves")
    }

    #[tokio::test]
    async fn found_handle_keeps_an_error_recorded_meanwhile() {
        let mut state = parsed("magnet:?xt=urn:btih:AAA&dn=Movie");
        state.set_phase(SessionPhase::Probing);
        state.record_error(SessionErrorKind::EngineFault, "tracker down");
        state.adopt(found_handle().await);
        assert_eq!(state.phase(), SessionPhase::Errored);
        assert_eq!(state.error_message(), Some("tracker down"));
        assert!(state.torrent().is_some());
        assert!(!state.can_start());

        let mut clean = parsed("magnet:?xt=urn:btih:AAA&dn=Movie");
        clean.set_phase(SessionPhase::Probing);
        clean.adopt(found_handle().await);
        assert_eq!(clean.phase(), SessionPhase::Joined);
    }

    #[test]
    fn phase_labels() {
        assert_eq!(SessionPhase::Absent.to_string(), "absent");
        assert!(SessionPhase::Terminated.is_closing());
        assert!(!SessionPhase::Errored.is_closing());
    }
}
