//! Engine child process speaking line-delimited JSON over stdio.

use std::process::Stdio;
use std::time::Duration;

use swarmview_protocol::{Message, encode_line};
use swarmview_remote::RemoteClient;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Running engine plus the tasks bridging its stdio to the client.
pub struct EngineProcess {
    child: Child,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl EngineProcess {
    /// Launch `program`, forwarding `outbound` to its stdin and feeding its
    /// stdout into `client`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EngineSpawn`] if the program cannot be started and
    /// [`AppError::EngineIo`] if its stdio pipes are unavailable.
    pub fn spawn(
        program: &str,
        args: &[String],
        outbound: mpsc::UnboundedReceiver<Message>,
        client: RemoteClient,
    ) -> AppResult<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AppError::EngineSpawn {
                command: program.to_owned(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            AppError::engine_io("engine.stdin", std::io::Error::other("stdin not captured"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            AppError::engine_io("engine.stdout", std::io::Error::other("stdout not captured"))
        })?;

        info!(program, pid = child.id(), "engine process started");
        Ok(Self {
            child,
            writer: tokio::spawn(write_commands(stdin, outbound)),
            reader: tokio::spawn(read_messages(stdout, client)),
        })
    }

    /// Give the engine `grace` to exit after destroy, then kill it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EngineIo`] if waiting for or killing the child fails.
    pub async fn shutdown(mut self, grace: Duration) -> AppResult<()> {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => info!(%status, "engine process exited"),
            Ok(Err(source)) => return Err(AppError::engine_io("engine.wait", source)),
            Err(_) => {
                warn!(
                    grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                    "engine still running after grace period; killing"
                );
                self.child
                    .kill()
                    .await
                    .map_err(|source| AppError::engine_io("engine.kill", source))?;
            }
        }
        self.writer.abort();
        self.reader.abort();
        Ok(())
    }
}

async fn write_commands(mut stdin: ChildStdin, mut outbound: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = outbound.recv().await {
        let line = match encode_line(&message) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, kind = message.kind(), "failed to encode command");
                continue;
            }
        };
        if let Err(err) = stdin.write_all(line.as_bytes()).await {
            warn!(error = %err, "engine stdin closed");
            break;
        }
        if let Err(err) = stdin.flush().await {
            warn!(error = %err, "failed to flush engine stdin");
            break;
        }
    }
    debug!("engine writer stopped");
}

async fn read_messages(stdout: ChildStdout, client: RemoteClient) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => client.receive_line(&line),
            Ok(None) => {
                debug!("engine stdout reached end of stream");
                break;
            }
            Err(err) => {
                warn!(error = %err, "failed to read from engine stdout");
                break;
            }
        }
    }
    client.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmview_remote::ChannelTransport;

    #[tokio::test]
    async fn missing_program_reports_spawn_error() {
        let (transport, outbound) = ChannelTransport::new();
        let client = RemoteClient::new(transport);
        let outcome = EngineProcess::spawn(
            "swarmview-engine-that-does-not-exist",
            &[],
            outbound,
            client,
        );
        assert!(matches!(
            outcome,
            Err(AppError::EngineSpawn { ref command, .. })
                if command == "swarmview-engine-that-does-not-exist"
        ));
    }
}
