//! Lifecycle controller: the only writer of [`SessionState`].
//!
//! # Design
//! - Command futures run on their own tasks and report back as [`Signal`]s, so
//!   events and refresh ticks keep flowing while a command is outstanding.
//! - The outstanding command is tracked apart from the phase. An engine-wide
//!   error recorded meanwhile does not cancel it; its result still lands.
//! - Once the phase is closing, every late signal is discarded.

use std::time::Duration;

use swarmview_protocol::DestroyOptions;
use swarmview_remote::{
    ClientEvent, Operation, RemoteClient, RemoteError, RemoteResult, TorrentEvent,
    TorrentHandle, with_timeout,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::descriptor::parse_descriptor;
use crate::error::SessionErrorKind;
use crate::state::{SessionOutput, SessionPhase, SessionState};
use crate::view::{Renderer, select_view};

/// Inputs the controller receives from its helper tasks.
#[derive(Debug)]
pub(crate) enum Signal {
    Probed(RemoteResult<TorrentHandle>),
    Added(RemoteResult<TorrentHandle>),
    Torrent(TorrentEvent),
    Client(ClientEvent),
}

/// Requests from the session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Start,
    Close,
}

pub(crate) struct Controller<R> {
    client: RemoteClient,
    config: SessionConfig,
    state: SessionState,
    renderer: R,
    signals: mpsc::UnboundedSender<Signal>,
    output: watch::Sender<SessionOutput>,
    tasks: Vec<JoinHandle<()>>,
    refresh_requested: bool,
}

impl<R: Renderer> Controller<R> {
    pub(crate) fn new(
        client: RemoteClient,
        config: SessionConfig,
        state: SessionState,
        renderer: R,
        signals: mpsc::UnboundedSender<Signal>,
        output: watch::Sender<SessionOutput>,
    ) -> Self {
        Self {
            client,
            config,
            state,
            renderer,
            signals,
            output,
            tasks: Vec::new(),
            refresh_requested: false,
        }
    }

    pub(crate) const fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub(crate) const fn refresh_interval(&self) -> Duration {
        self.config.refresh_interval
    }

    /// Returns `true` once after the refresh loop should start.
    pub(crate) const fn take_refresh_request(&mut self) -> bool {
        let requested = self.refresh_requested;
        self.refresh_requested = false;
        requested
    }

    /// Parse the identifier and, when it is usable, probe the engine.
    pub(crate) fn begin(&mut self) {
        self.forward_client_events();

        match parse_descriptor(self.state.identifier()) {
            Ok(descriptor) => {
                info!(
                    torrent_id = %self.state.identifier(),
                    name = descriptor.name.as_deref().unwrap_or_default(),
                    "session started"
                );
                self.state.set_descriptor(descriptor);
                self.state.set_phase(SessionPhase::Probing);
                self.state.begin_command(Operation::Get);
                self.spawn_probe();
            }
            Err(err) => {
                warn!(
                    torrent_id = %self.state.identifier(),
                    error = %err,
                    "rejecting malformed torrent identifier"
                );
                self.state.record_error(
                    SessionErrorKind::MalformedIdentifier,
                    format!("malformed identifier: {err}"),
                );
                self.refresh_requested = true;
            }
        }
        self.render();
    }

    pub(crate) fn handle_signal(&mut self, signal: Signal) {
        if self.state.phase().is_closing() {
            debug!(?signal, "session closing; dropping signal");
            return;
        }
        match signal {
            Signal::Probed(outcome) => self.on_probed(outcome),
            Signal::Added(outcome) => self.on_added(outcome),
            Signal::Torrent(event) => self.on_torrent_event(event),
            Signal::Client(event) => self.on_client_event(event),
        }
    }

    /// Explicit user start. Ignored unless the state offers it.
    pub(crate) fn start(&mut self) {
        if !self.state.can_start() {
            debug!(phase = %self.state.phase(), "start ignored in current phase");
            return;
        }
        info!(torrent_id = %self.state.identifier(), "joining torrent swarm");
        self.state.set_phase(SessionPhase::Starting);
        self.state.begin_command(Operation::Add);
        self.spawn_add();
        self.render();
    }

    /// End the session: destroy once, stop helpers, publish `Terminated`.
    pub(crate) fn close(&mut self) {
        if self.state.phase().is_closing() {
            return;
        }
        self.state.set_phase(SessionPhase::Destroying);
        self.publish();

        self.client
            .destroy(DestroyOptions::with_delay(self.config.destroy_grace));
        for task in self.tasks.drain(..) {
            task.abort();
        }

        self.state.set_phase(SessionPhase::Terminated);
        self.publish();
        info!(torrent_id = %self.state.identifier(), "session terminated");
    }

    /// Derive the view and hand it to the renderer.
    pub(crate) fn render(&mut self) {
        let output = self.state.output();
        let view = select_view(&output);
        self.renderer.render(&output, &view);
        self.output.send_replace(output);
    }

    fn publish(&self) {
        self.output.send_replace(self.state.output());
    }

    fn on_probed(&mut self, outcome: RemoteResult<TorrentHandle>) {
        if !self.state.finish_command(Operation::Get) {
            debug!(phase = %self.state.phase(), "stale probe result ignored");
            return;
        }
        match outcome {
            Ok(handle) => {
                info!(torrent_id = %handle.torrent_id(), "engine already runs torrent");
                self.subscribe_torrent(&handle);
                self.state.adopt(handle);
            }
            Err(err) if err.is_not_found() => {
                debug!(torrent_id = %self.state.identifier(), "torrent not running; awaiting start");
                if self.state.phase() == SessionPhase::Probing {
                    self.state.set_phase(SessionPhase::Absent);
                }
            }
            Err(err) => {
                warn!(error = %err, detail = %err.message(), "torrent probe failed");
                self.state
                    .record_error(failure_kind(&err, SessionErrorKind::ProbeFailed), err.message());
            }
        }
        self.refresh_requested = true;
        self.render();
    }

    fn on_added(&mut self, outcome: RemoteResult<TorrentHandle>) {
        if !self.state.finish_command(Operation::Add) {
            debug!(phase = %self.state.phase(), "stale add result ignored");
            return;
        }
        match outcome {
            Ok(handle) => {
                info!(torrent_id = %handle.torrent_id(), "joined torrent swarm");
                self.subscribe_torrent(&handle);
                self.state.attach(handle);
            }
            Err(err) => {
                warn!(error = %err, detail = %err.message(), "failed to join torrent");
                self.state
                    .record_error(failure_kind(&err, SessionErrorKind::JoinFailed), err.message());
            }
        }
        self.render();
    }

    fn on_torrent_event(&mut self, event: TorrentEvent) {
        match event {
            TorrentEvent::Warning { message } => {
                warn!(torrent_id = %self.state.identifier(), warning = %message, "torrent warning");
            }
            TorrentEvent::Error { message } => {
                if self.state.torrent().is_none() {
                    debug!("torrent error without an attached handle ignored");
                    return;
                }
                warn!(torrent_id = %self.state.identifier(), error = %message, "torrent fault");
                self.state
                    .record_error(SessionErrorKind::TorrentFault, message);
                self.render();
            }
        }
    }

    fn on_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Warning { message } => {
                warn!(warning = %message, "engine warning");
            }
            ClientEvent::Error { message } => {
                warn!(error = %message, "engine fault");
                self.state.record_error(SessionErrorKind::EngineFault, message);
                self.render();
            }
        }
    }

    /// Forward the handle's events, including any it buffered before this
    /// subscription.
    fn subscribe_torrent(&mut self, handle: &TorrentHandle) {
        let mut events = handle.subscribe_with_backlog();
        let signals = self.signals.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if signals.send(Signal::Torrent(event)).is_err() {
                    break;
                }
            }
        }));
    }

    fn forward_client_events(&mut self) {
        let mut events = self.client.subscribe();
        let signals = self.signals.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if signals.send(Signal::Client(event)).is_err() {
                    break;
                }
            }
        }));
    }

    fn spawn_probe(&mut self) {
        let client = self.client.clone();
        let identifier = self.state.identifier().to_owned();
        let deadline = self.config.command_timeout;
        let signals = self.signals.clone();
        self.tasks.push(tokio::spawn(async move {
            let outcome = bounded("get", deadline, client.get(&identifier)).await;
            let _ = signals.send(Signal::Probed(outcome));
        }));
    }

    fn spawn_add(&mut self) {
        let client = self.client.clone();
        let identifier = self.state.identifier().to_owned();
        let options = self.config.add_options.clone();
        let deadline = self.config.command_timeout;
        let signals = self.signals.clone();
        self.tasks.push(tokio::spawn(async move {
            let outcome = bounded("add", deadline, client.add(&identifier, options)).await;
            let _ = signals.send(Signal::Added(outcome));
        }));
    }
}

async fn bounded<F>(
    operation: &'static str,
    deadline: Option<Duration>,
    future: F,
) -> RemoteResult<TorrentHandle>
where
    F: Future<Output = RemoteResult<TorrentHandle>>,
{
    match deadline {
        Some(after) => with_timeout(operation, after, future).await,
        None => future.await,
    }
}

const fn failure_kind(err: &RemoteError, fallback: SessionErrorKind) -> SessionErrorKind {
    if err.is_channel_closed() {
        SessionErrorKind::ChannelClosed
    } else {
        fallback
    }
}
