//! Correlation table for commands awaiting a response.

use std::collections::HashMap;

use swarmview_protocol::CommandToken;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::RemoteResult;
use crate::handle::TorrentHandle;

/// Commands tracked by the correlation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Non-creating probe.
    Get,
    /// Join or start.
    Add,
    /// Teardown.
    Destroy,
}

impl Operation {
    /// Label used in logs, metrics and error context.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Add => "add",
            Self::Destroy => "destroy",
        }
    }
}

pub(crate) type Completion = oneshot::Sender<RemoteResult<TorrentHandle>>;

/// Record kept for each outstanding command.
#[derive(Debug)]
pub(crate) struct PendingCommand {
    pub(crate) operation: Operation,
    pub(crate) torrent_id: Option<String>,
    respond_to: Option<Completion>,
}

impl PendingCommand {
    pub(crate) fn new(
        operation: Operation,
        torrent_id: Option<String>,
        respond_to: Option<Completion>,
    ) -> Self {
        Self {
            operation,
            torrent_id,
            respond_to,
        }
    }

    /// Complete the caller's future, if anyone is still waiting for it.
    pub(crate) fn resolve(self, outcome: RemoteResult<TorrentHandle>) {
        let Some(respond_to) = self.respond_to else {
            return;
        };
        if respond_to.send(outcome).is_err() {
            debug!(
                operation = self.operation.as_str(),
                "command caller went away before the response arrived"
            );
        }
    }
}

/// Token-keyed table of outstanding commands.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: HashMap<CommandToken, PendingCommand>,
}

impl PendingTable {
    pub(crate) fn insert(&mut self, token: CommandToken, command: PendingCommand) {
        self.entries.insert(token, command);
    }

    pub(crate) fn take(&mut self, token: &CommandToken) -> Option<PendingCommand> {
        self.entries.remove(token)
    }

    pub(crate) fn drain(&mut self) -> Vec<PendingCommand> {
        self.entries.drain().map(|(_, command)| command).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
