//! Scripted in-process engine speaking the wire protocol over channels.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use swarmview_protocol::{
    Command, CommandToken, EngineEvent, Message, TorrentSnapshot, WireError,
};
use swarmview_remote::{ChannelTransport, RemoteClient};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// How long helpers wait for the client to emit a command.
pub const COMMAND_WAIT: Duration = Duration::from_secs(2);

/// Engine stand-in. Commands sent by the client are queued for the test to
/// inspect; responses and events travel back through the client's inbound pump.
pub struct EngineHarness {
    client: RemoteClient,
    outbound: mpsc::UnboundedReceiver<Message>,
    inbound: Option<mpsc::UnboundedSender<Message>>,
    pump: JoinHandle<()>,
}

impl EngineHarness {
    /// Wire a fresh client to a scripted engine.
    #[must_use]
    pub fn new() -> Self {
        let (transport, outbound) = ChannelTransport::new();
        let client = RemoteClient::new(transport);
        let (inbound, inbound_rx) = mpsc::unbounded_channel();
        let pump = client.spawn_pump(inbound_rx);
        Self {
            client,
            outbound,
            inbound: Some(inbound),
            pump,
        }
    }

    /// Client connected to this engine.
    #[must_use]
    pub fn client(&self) -> RemoteClient {
        self.client.clone()
    }

    /// Wait for the next command the client sends.
    ///
    /// # Errors
    ///
    /// Fails when no command arrives within [`COMMAND_WAIT`] or a non-command
    /// message shows up.
    pub async fn next_command(&mut self) -> Result<(CommandToken, Command)> {
        let message = timeout(COMMAND_WAIT, self.outbound.recv())
            .await
            .context("timed out waiting for a command")?
            .ok_or_else(|| anyhow!("client transport dropped"))?;
        match message {
            Message::Command { token, command } => Ok((token, command)),
            other => Err(anyhow!("expected a command, got {}", other.kind())),
        }
    }

    /// Wait for the next command and require it to have `name`.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::next_command`], or when the name differs.
    pub async fn expect_command(&mut self, name: &str) -> Result<(CommandToken, Command)> {
        let (token, command) = self.next_command().await?;
        if command.name() != name {
            return Err(anyhow!("expected {name}, got {}", command.name()));
        }
        Ok((token, command))
    }

    /// Commands sent so far and not yet consumed.
    pub fn drain_commands(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            if let Message::Command { command, .. } = message {
                commands.push(command);
            }
        }
        commands
    }

    /// Whether the client stays silent for `window`.
    pub async fn is_quiet_for(&mut self, window: Duration) -> bool {
        timeout(window, self.outbound.recv()).await.is_err()
    }

    /// Answer `token` successfully.
    ///
    /// # Errors
    ///
    /// Fails when the engine has been disconnected.
    pub fn respond_ok(&self, token: CommandToken, snapshot: Option<TorrentSnapshot>) -> Result<()> {
        self.deliver(Message::success(token, snapshot))
    }

    /// Answer `token` with "not found".
    ///
    /// # Errors
    ///
    /// Fails when the engine has been disconnected.
    pub fn respond_not_found(&self, token: CommandToken) -> Result<()> {
        self.deliver(Message::failure(token, WireError::not_found("torrent not found")))
    }

    /// Answer `token` with an engine failure.
    ///
    /// # Errors
    ///
    /// Fails when the engine has been disconnected.
    pub fn respond_failed(&self, token: CommandToken, message: &str) -> Result<()> {
        self.deliver(Message::failure(token, WireError::failed(message)))
    }

    /// Push an unsolicited event.
    ///
    /// # Errors
    ///
    /// Fails when the engine has been disconnected.
    pub fn emit(&self, torrent_id: Option<&str>, event: EngineEvent) -> Result<()> {
        self.deliver(Message::event(torrent_id, event))
    }

    /// Drop the inbound channel and wait for the client to observe the close.
    ///
    /// # Errors
    ///
    /// Fails when the pump does not stop within [`COMMAND_WAIT`].
    pub async fn disconnect(&mut self) -> Result<()> {
        self.inbound = None;
        timeout(COMMAND_WAIT, &mut self.pump)
            .await
            .context("pump did not stop")?
            .context("pump panicked")?;
        Ok(())
    }

    fn deliver(&self, message: Message) -> Result<()> {
        self.inbound
            .as_ref()
            .ok_or_else(|| anyhow!("engine disconnected"))?
            .send(message)
            .map_err(|_| anyhow!("client pump stopped"))
    }
}

impl Default for EngineHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot with a name and a single file, as an engine would report after
/// metadata arrives.
#[must_use]
pub fn snapshot_named(name: &str) -> TorrentSnapshot {
    TorrentSnapshot {
        name: Some(name.to_owned()),
        files: vec![swarmview_protocol::TorrentFile {
            name: format!("{name}.mp4"),
            path: format!("{name}/{name}.mp4"),
            length: 1_024,
        }],
        ..TorrentSnapshot::default()
    }
}
