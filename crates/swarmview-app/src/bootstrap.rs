//! Wiring for the terminal application: logging, engine process, session and
//! stdin controls.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use swarmview_remote::{ChannelTransport, RemoteClient};
use swarmview_session::{Session, SessionHandle};
use swarmview_telemetry::{Metrics, init_logging};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cli::Cli;
use crate::engine::EngineProcess;
use crate::error::{AppError, AppResult};
use crate::render::TerminalRenderer;
use crate::save::save_torrent_file;

/// Extra time the engine gets beyond the destroy grace before it is killed.
const SHUTDOWN_MARGIN: Duration = Duration::from_secs(2);

/// Parse the command line and run until the session terminates.
///
/// # Errors
///
/// Returns an error if configuration is invalid, logging cannot be installed,
/// the engine cannot be launched, or the session fails to start.
pub async fn run_app() -> AppResult<()> {
    run_app_with(Cli::parse()).await
}

pub(crate) async fn run_app_with(cli: Cli) -> AppResult<()> {
    let logging = cli.logging_config()?;
    init_logging(&logging).map_err(|source| AppError::telemetry("telemetry.init", source))?;
    let config = cli.session_config()?;
    let metrics = Metrics::new().map_err(|source| AppError::telemetry("metrics.init", source))?;

    info!(
        identifier = %cli.identifier,
        engine = %cli.engine_cmd,
        refresh_ms = cli.refresh_ms,
        "swarmview starting"
    );

    let (transport, outbound) = ChannelTransport::new();
    let client = RemoteClient::with_metrics(transport, metrics.clone());
    let engine = EngineProcess::spawn(&cli.engine_cmd, &cli.engine_args, outbound, client.clone())?;

    let grace = config.destroy_grace;
    let session = Session::spawn(
        client,
        cli.identifier.clone(),
        TerminalRenderer::stdout(),
        config,
    )
    .map_err(|source| AppError::session("session.spawn", source))?;

    let save_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let input = spawn_input(session.clone(), cli.identifier.clone(), save_dir);
    tokio::select! {
        () = session.wait_terminated() => {
            debug!("session terminated on its own");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(error = %err, "failed to listen for ctrl-c; closing");
            } else {
                info!("interrupt received; closing session");
            }
            session.close();
            session.wait_terminated().await;
        }
    }
    input.abort();

    engine.shutdown(grace + SHUTDOWN_MARGIN).await?;
    match metrics.render() {
        Ok(text) => debug!(metrics = %text, "bridge metrics at shutdown"),
        Err(err) => warn!(error = %err, "failed to render bridge metrics"),
    }
    info!("swarmview stopped");
    Ok(())
}

/// Commands typed on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputCommand {
    Start,
    Save,
    Quit,
}

pub(crate) fn parse_input(line: &str) -> Option<InputCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "s" | "start" => Some(InputCommand::Start),
        "w" | "save" => Some(InputCommand::Save),
        "q" | "quit" | "exit" => Some(InputCommand::Quit),
        _ => None,
    }
}

fn spawn_input(
    session: SessionHandle,
    identifier: String,
    save_dir: PathBuf,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "failed to read stdin");
                    break;
                }
            };
            match parse_input(&line) {
                Some(InputCommand::Start) => {
                    if let Err(err) = session.start() {
                        debug!(error = %err, "start ignored");
                    }
                }
                Some(InputCommand::Save) => match save_torrent_file(&identifier, &save_dir).await {
                    Ok(path) => info!(path = %path.display(), "saved torrent file"),
                    Err(err) => warn!(error = %err, "failed to save torrent file"),
                },
                Some(InputCommand::Quit) => {
                    session.close();
                    break;
                }
                None if line.trim().is_empty() => {}
                None => error!(input = %line.trim(), "ignoring unknown command"),
            }
        }
    })
}
