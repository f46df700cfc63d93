//! Remote session client: command correlation, event fan-in, handle registry.
//!
//! # Design
//! - One `std::sync::Mutex` guards the pending table, the handle registry and
//!   the closed flag. It is never held across an await.
//! - Responses are matched by token only. A successful `get`/`add` registers
//!   the handle inside `receive`, before the next inbound message is looked at.
//! - Destroy is fire-and-forget: it never reports failure to the caller.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use swarmview_protocol::{
    AddOptions, Command, CommandToken, DestroyOptions, EngineEvent, Message, ProtocolError,
    TorrentSnapshot, WireError, WireErrorKind, decode_line,
};
use swarmview_telemetry::Metrics;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{RemoteError, RemoteResult};
use crate::handle::{TorrentEvent, TorrentHandle};
use crate::pending::{Operation, PendingCommand, PendingTable};
use crate::subscription::Subscription;
use crate::transport::Transport;

/// Broadcast capacity for client-level events.
const CLIENT_EVENT_CAPACITY: usize = 64;

/// Events addressed to the client as a whole rather than a single torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Non-fatal engine condition.
    Warning {
        /// Engine-provided description.
        message: String,
    },
    /// Engine-wide fault.
    Error {
        /// Engine-provided description.
        message: String,
    },
}

/// UI-side half of the bridge to the engine process.
#[derive(Clone)]
pub struct RemoteClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Box<dyn Transport>,
    state: Mutex<ClientState>,
    events: broadcast::Sender<ClientEvent>,
    metrics: Option<Metrics>,
}

#[derive(Default)]
struct ClientState {
    pending: PendingTable,
    torrents: HashMap<String, TorrentHandle>,
    closed: bool,
}

impl RemoteClient {
    /// Build a client sending through `transport`.
    #[must_use]
    pub fn new(transport: impl Transport) -> Self {
        Self::build(Box::new(transport), None)
    }

    /// Build a client that also records bridge metrics.
    #[must_use]
    pub fn with_metrics(transport: impl Transport, metrics: Metrics) -> Self {
        Self::build(Box::new(transport), Some(metrics))
    }

    fn build(transport: Box<dyn Transport>, metrics: Option<Metrics>) -> Self {
        let (events, _) = broadcast::channel(CLIENT_EVENT_CAPACITY);
        Self {
            inner: Arc::new(ClientInner {
                transport,
                state: Mutex::new(ClientState::default()),
                events,
                metrics,
            }),
        }
    }

    /// Look up a torrent the engine is already running. Never creates one.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::NotFound`] when the engine does not know the
    /// torrent, [`RemoteError::Engine`] when it failed the probe, and
    /// [`RemoteError::ChannelClosed`] when the transport is gone.
    pub async fn get(&self, torrent_id: &str) -> RemoteResult<TorrentHandle> {
        self.dispatch(
            Operation::Get,
            Command::Get {
                torrent_id: torrent_id.to_owned(),
            },
        )
        .await
    }

    /// Join the swarm for a torrent, creating it in the engine if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Engine`] (or [`RemoteError::NotFound`]) when the
    /// engine refuses, and [`RemoteError::ChannelClosed`] when the transport is
    /// gone.
    pub async fn add(&self, torrent_id: &str, options: AddOptions) -> RemoteResult<TorrentHandle> {
        self.dispatch(
            Operation::Add,
            Command::Add {
                torrent_id: torrent_id.to_owned(),
                options,
            },
        )
        .await
    }

    /// Ask the engine to release this client's resources after a grace period.
    ///
    /// Every registered handle is detached. Nothing is awaited and failures
    /// are only logged.
    pub fn destroy(&self, options: DestroyOptions) {
        let token = CommandToken::new();
        let detached = {
            let mut state = self.lock_state();
            let detached: Vec<TorrentHandle> = state.torrents.drain().map(|(_, h)| h).collect();
            if state.closed {
                drop(state);
                debug!(
                    detached = detached.len(),
                    "destroy skipped; engine channel already closed"
                );
                return;
            }
            state.pending.insert(
                token,
                PendingCommand::new(Operation::Destroy, None, None),
            );
            self.record_pending(state.pending.len());
            detached.len()
        };
        info!(
            delay_ms = options.delay_ms,
            detached, "destroying remote session"
        );
        self.send_command(token, Operation::Destroy, Command::from(options));
    }

    /// Subscribe to client-level warnings and errors emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<ClientEvent> {
        Subscription::new(Default::default(), self.inner.events.subscribe())
    }

    /// Inbound half of the bridge: deliver one message from the engine.
    pub fn receive(&self, message: Message) {
        match message {
            Message::Response {
                token,
                payload,
                error,
            } => self.handle_response(token, payload, error),
            Message::Event { torrent_id, event } => self.handle_event(torrent_id, event),
            Message::Command { token, command } => {
                debug!(
                    token = %token,
                    command = command.name(),
                    "engine sent a command; dropping"
                );
                self.record_dropped("unexpected_command");
            }
        }
    }

    /// Decode one JSON line from the engine and deliver it.
    ///
    /// Blank lines are skipped; undecodable lines are logged and dropped.
    pub fn receive_line(&self, line: &str) {
        match decode_line(line) {
            Ok(message) => self.receive(message),
            Err(ProtocolError::EmptyFrame) => {}
            Err(err) => {
                warn!(error = %err, "dropping undecodable engine message");
                self.record_dropped("decode");
            }
        }
    }

    /// Mark the transport closed and fail every outstanding command.
    ///
    /// Later commands fail immediately with [`RemoteError::ChannelClosed`].
    /// Calling this more than once is a no-op.
    pub fn close(&self) {
        let drained = {
            let mut state = self.lock_state();
            if state.closed {
                return;
            }
            state.closed = true;
            let drained = state.pending.drain();
            self.record_pending(0);
            drained
        };
        info!(pending = drained.len(), "engine channel closed");
        for entry in drained {
            let operation = entry.operation.as_str();
            entry.resolve(Err(RemoteError::ChannelClosed { operation }));
        }
    }

    /// Spawn a task feeding `inbound` into [`Self::receive`], closing the
    /// client when the channel ends.
    #[must_use]
    pub fn spawn_pump(&self, mut inbound: mpsc::UnboundedReceiver<Message>) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                client.receive(message);
            }
            client.close();
        })
    }

    /// Number of commands still awaiting a response.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Registered handle for `torrent_id`, if any.
    #[must_use]
    pub fn torrent(&self, torrent_id: &str) -> Option<TorrentHandle> {
        self.lock_state().torrents.get(torrent_id).cloned()
    }

    /// Whether [`Self::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    async fn dispatch(&self, operation: Operation, command: Command) -> RemoteResult<TorrentHandle> {
        let token = CommandToken::new();
        let (respond_to, response) = oneshot::channel();
        {
            let mut state = self.lock_state();
            if state.closed {
                return Err(RemoteError::ChannelClosed {
                    operation: operation.as_str(),
                });
            }
            let torrent_id = command.torrent_id().map(str::to_owned);
            state.pending.insert(
                token,
                PendingCommand::new(operation, torrent_id, Some(respond_to)),
            );
            self.record_pending(state.pending.len());
        }

        self.send_command(token, operation, command);

        response.await.unwrap_or(Err(RemoteError::ChannelClosed {
            operation: operation.as_str(),
        }))
    }

    fn send_command(&self, token: CommandToken, operation: Operation, command: Command) {
        let torrent_id = command.torrent_id().map(str::to_owned);
        match self.inner.transport.send(Message::Command { token, command }) {
            Ok(()) => {
                debug!(
                    token = %token,
                    command = operation.as_str(),
                    torrent_id = torrent_id.as_deref().unwrap_or_default(),
                    "command sent to engine"
                );
                if let Some(metrics) = &self.inner.metrics {
                    metrics.inc_command(operation.as_str());
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    token = %token,
                    command = operation.as_str(),
                    "failed to send command to engine"
                );
                let entry = {
                    let mut state = self.lock_state();
                    let entry = state.pending.take(&token);
                    self.record_pending(state.pending.len());
                    entry
                };
                if let Some(entry) = entry {
                    entry.resolve(Err(RemoteError::ChannelClosed {
                        operation: operation.as_str(),
                    }));
                }
            }
        }
    }

    fn handle_response(
        &self,
        token: CommandToken,
        payload: Option<TorrentSnapshot>,
        error: Option<WireError>,
    ) {
        let mut state = self.lock_state();
        let Some(entry) = state.pending.take(&token) else {
            drop(state);
            debug!(token = %token, "response for unknown token; dropping");
            self.record_dropped("unknown_token");
            return;
        };
        self.record_pending(state.pending.len());

        let operation = entry.operation;
        let torrent_id = entry.torrent_id.clone().unwrap_or_default();
        let outcome = match (operation, error, payload) {
            (Operation::Destroy, error, _) => {
                drop(state);
                match error {
                    Some(err) => warn!(error = %err.message, "engine reported destroy failure"),
                    None => debug!("engine acknowledged destroy"),
                }
                self.record_response("ok");
                return;
            }
            (_, Some(err), _) if err.kind == WireErrorKind::NotFound => {
                Err(RemoteError::NotFound { torrent_id })
            }
            (_, Some(err), _) => Err(RemoteError::Engine {
                operation: operation.as_str(),
                torrent_id: Some(torrent_id),
                message: err.message,
            }),
            (Operation::Get, None, None) => Err(RemoteError::NotFound { torrent_id }),
            (_, None, payload) => {
                let handle = state
                    .torrents
                    .entry(torrent_id.clone())
                    .or_insert_with(|| TorrentHandle::new(torrent_id, TorrentSnapshot::default()))
                    .clone();
                handle.apply_snapshot(payload.unwrap_or_default());
                Ok(handle)
            }
        };
        drop(state);

        let label = match &outcome {
            Ok(_) => "ok",
            Err(RemoteError::NotFound { .. }) => "not_found",
            Err(_) => "failed",
        };
        debug!(
            token = %token,
            command = operation.as_str(),
            outcome = label,
            "engine response matched"
        );
        self.record_response(label);
        entry.resolve(outcome);
    }

    fn handle_event(&self, torrent_id: Option<String>, event: EngineEvent) {
        let kind = event.kind();
        let Some(torrent_id) = torrent_id else {
            let client_event = match event {
                EngineEvent::Warning { message } => ClientEvent::Warning { message },
                EngineEvent::Error { message } => ClientEvent::Error { message },
                EngineEvent::Progress { .. } => {
                    debug!("progress event without a torrent; dropping");
                    self.record_dropped("untargeted_progress");
                    return;
                }
            };
            self.record_event(kind);
            let _ = self.inner.events.send(client_event);
            return;
        };

        let Some(handle) = self.torrent(&torrent_id) else {
            debug!(torrent_id = %torrent_id, kind, "event for unknown torrent; dropping");
            self.record_dropped("unknown_torrent");
            return;
        };

        self.record_event(kind);
        match event {
            EngineEvent::Progress { snapshot } => handle.apply_snapshot(snapshot),
            EngineEvent::Warning { message } => handle.emit(TorrentEvent::Warning { message }),
            EngineEvent::Error { message } => handle.emit(TorrentEvent::Error { message }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn record_pending(&self, count: usize) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.set_pending_commands(count);
        }
    }

    fn record_response(&self, outcome: &str) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.inc_response(outcome);
        }
    }

    fn record_event(&self, kind: &str) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.inc_event(kind);
        }
    }

    fn record_dropped(&self, reason: &str) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.inc_dropped(reason);
        }
    }
}

impl Debug for RemoteClient {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        formatter
            .debug_struct("RemoteClient")
            .field("pending", &state.pending.len())
            .field("torrents", &state.torrents.len())
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}

/// Await `future`, failing with [`RemoteError::TimedOut`] once `after` elapses.
///
/// The command itself stays pending on the client; a late response resolves
/// into the void.
///
/// # Errors
///
/// Returns whatever `future` returns, or [`RemoteError::TimedOut`].
pub async fn with_timeout<T, F>(operation: &'static str, after: Duration, future: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(outcome) => outcome,
        Err(_) => Err(RemoteError::TimedOut { operation, after }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);

    async fn next_command(outbound: &mut UnboundedReceiver<Message>) -> (CommandToken, Command) {
        match timeout(WAIT, outbound.recv()).await {
            Ok(Some(Message::Command { token, command })) => (token, command),
            other => panic!("expected a command, got {other:?}"),
        }
    }

    fn named(name: &str) -> TorrentSnapshot {
        TorrentSnapshot {
            name: Some(name.to_owned()),
            ..TorrentSnapshot::default()
        }
    }

    #[tokio::test]
    async fn reverse_order_responses_reach_their_own_callers() -> anyhow::Result<()> {
        let (transport, mut outbound) = ChannelTransport::new();
        let client = RemoteClient::new(transport);

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.get("alpha").await }
        });
        let (first_token, first_command) = next_command(&mut outbound).await;
        let second = tokio::spawn({
            let client = client.clone();
            async move { client.add("beta", AddOptions::engine_managed()).await }
        });
        let (second_token, second_command) = next_command(&mut outbound).await;

        assert_ne!(first_token, second_token);
        assert_eq!(first_command.torrent_id(), Some("alpha"));
        assert_eq!(second_command.name(), "add");
        assert_eq!(client.pending_commands(), 2);

        client.receive(Message::success(second_token, Some(named("Beta"))));
        client.receive(Message::success(first_token, Some(named("Alpha"))));

        let alpha = timeout(WAIT, first).await???;
        let beta = timeout(WAIT, second).await???;
        assert_eq!(alpha.torrent_id(), "alpha");
        assert_eq!(alpha.snapshot().name.as_deref(), Some("Alpha"));
        assert_eq!(beta.torrent_id(), "beta");
        assert_eq!(beta.snapshot().name.as_deref(), Some("Beta"));
        assert_eq!(client.pending_commands(), 0);
        assert!(client.torrent("alpha").is_some_and(|h| h.same_torrent(&alpha)));
        Ok(())
    }

    #[tokio::test]
    async fn probe_outcomes_are_classified() -> anyhow::Result<()> {
        let (transport, mut outbound) = ChannelTransport::new();
        let client = RemoteClient::new(transport);

        let empty = tokio::spawn({
            let client = client.clone();
            async move { client.get("gone").await }
        });
        let (token, _) = next_command(&mut outbound).await;
        client.receive(Message::success(token, None));
        assert_eq!(
            timeout(WAIT, empty).await??,
            Err(RemoteError::NotFound {
                torrent_id: "gone".into()
            })
        );

        let refused = tokio::spawn({
            let client = client.clone();
            async move { client.add("bad", AddOptions::default()).await }
        });
        let (token, _) = next_command(&mut outbound).await;
        client.receive(Message::failure(token, WireError::failed("tracker refused")));
        let err = timeout(WAIT, refused)
            .await??
            .err()
            .ok_or_else(|| anyhow::anyhow!("add should fail"))?;
        assert_eq!(err.message(), "tracker refused");
        assert!(client.torrent("bad").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn close_resolves_every_pending_command() -> anyhow::Result<()> {
        let (transport, mut outbound) = ChannelTransport::new();
        let client = RemoteClient::new(transport);

        let waiting = tokio::spawn({
            let client = client.clone();
            async move { client.get("alpha").await }
        });
        let _ = next_command(&mut outbound).await;
        assert_eq!(client.pending_commands(), 1);

        client.close();
        client.close();
        assert_eq!(
            timeout(WAIT, waiting).await??,
            Err(RemoteError::ChannelClosed { operation: "get" })
        );
        assert_eq!(client.pending_commands(), 0);
        assert!(client.is_closed());

        let later = client.add("alpha", AddOptions::default()).await;
        assert_eq!(later, Err(RemoteError::ChannelClosed { operation: "add" }));
        Ok(())
    }

    #[tokio::test]
    async fn send_failures_resolve_channel_closed() {
        let (transport, outbound) = ChannelTransport::new();
        drop(outbound);
        let client = RemoteClient::new(transport);

        let outcome = timeout(WAIT, client.get("alpha")).await;
        assert_eq!(
            outcome.ok(),
            Some(Err(RemoteError::ChannelClosed { operation: "get" }))
        );
        assert_eq!(client.pending_commands(), 0);
    }

    #[tokio::test]
    async fn unknown_tokens_and_torrents_are_dropped() -> anyhow::Result<()> {
        let (transport, _outbound) = ChannelTransport::new();
        let metrics = Metrics::new()?;
        let client = RemoteClient::with_metrics(transport, metrics.clone());

        client.receive(Message::success(CommandToken::new(), Some(named("x"))));
        client.receive(Message::event(
            Some("nobody"),
            EngineEvent::Error {
                message: "lost".into(),
            },
        ));
        client.receive_line("not json at all");
        client.receive_line("   ");

        assert_eq!(client.pending_commands(), 0);
        assert!(client.torrent("x").is_none());
        assert_eq!(metrics.snapshot().dropped_messages_total, 3);
        Ok(())
    }

    #[tokio::test]
    async fn events_route_to_handles_and_client_subscribers() -> anyhow::Result<()> {
        let (transport, mut outbound) = ChannelTransport::new();
        let client = RemoteClient::new(transport);
        let mut client_events = client.subscribe();

        let probe = tokio::spawn({
            let client = client.clone();
            async move { client.get("alpha").await }
        });
        let (token, _) = next_command(&mut outbound).await;
        client.receive(Message::success(token, Some(named("Alpha"))));
        let handle = timeout(WAIT, probe).await???;
        let mut torrent_events = handle.subscribe();

        client.receive(Message::event(
            Some("alpha"),
            EngineEvent::Progress {
                snapshot: TorrentSnapshot {
                    num_peers: 7,
                    ..named("Alpha")
                },
            },
        ));
        client.receive(Message::event(
            Some("alpha"),
            EngineEvent::Error {
                message: "disk full".into(),
            },
        ));
        client.receive(Message::event(
            None,
            EngineEvent::Warning {
                message: "tracker slow".into(),
            },
        ));

        assert_eq!(handle.snapshot().num_peers, 7);
        assert_eq!(
            timeout(WAIT, torrent_events.next()).await?,
            Some(TorrentEvent::Error {
                message: "disk full".into()
            })
        );
        assert_eq!(
            timeout(WAIT, client_events.next()).await?,
            Some(ClientEvent::Warning {
                message: "tracker slow".into()
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn destroy_detaches_handles_and_never_fails() -> anyhow::Result<()> {
        let (transport, mut outbound) = ChannelTransport::new();
        let client = RemoteClient::new(transport);

        let probe = tokio::spawn({
            let client = client.clone();
            async move { client.get("alpha").await }
        });
        let (token, _) = next_command(&mut outbound).await;
        client.receive(Message::success(token, Some(named("A"))));
        let _handle = timeout(WAIT, probe).await???;

        client.destroy(DestroyOptions::with_delay(Duration::from_millis(1_000)));
        let (destroy_token, command) = next_command(&mut outbound).await;
        assert_eq!(command, Command::Destroy { delay_ms: 1_000 });
        assert!(client.torrent("alpha").is_none());

        client.receive(Message::success(destroy_token, None));
        assert_eq!(client.pending_commands(), 0);

        client.close();
        client.destroy(DestroyOptions::default());
        assert!(
            timeout(Duration::from_millis(50), outbound.recv())
                .await
                .is_err(),
            "no destroy should be sent after close"
        );
        Ok(())
    }

    #[tokio::test]
    async fn pump_closes_the_client_when_inbound_ends() -> anyhow::Result<()> {
        let (transport, mut outbound) = ChannelTransport::new();
        let client = RemoteClient::new(transport);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let pump = client.spawn_pump(inbound_rx);

        let probe = tokio::spawn({
            let client = client.clone();
            async move { client.get("alpha").await }
        });
        let (token, _) = next_command(&mut outbound).await;
        inbound_tx.send(Message::failure(token, WireError::not_found("nope")))?;
        assert!(timeout(WAIT, probe).await??.is_err_and(|err| err.is_not_found()));

        drop(inbound_tx);
        timeout(WAIT, pump).await??;
        assert!(client.is_closed());
        Ok(())
    }

    #[tokio::test]
    async fn with_timeout_reports_the_deadline() {
        let never = std::future::pending::<RemoteResult<()>>();
        let outcome = with_timeout("get", Duration::from_millis(10), never).await;
        assert_eq!(
            outcome,
            Err(RemoteError::TimedOut {
                operation: "get",
                after: Duration::from_millis(10)
            })
        );

        let ready = with_timeout("get", WAIT, async { Ok(5) }).await;
        assert_eq!(ready, Ok(5));
    }
}
