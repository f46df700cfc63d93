//! Session actor and its control handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use swarmview_remote::RemoteClient;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::SessionConfig;
use crate::controller::{Control, Controller, Signal};
use crate::error::{SessionError, SessionResult};
use crate::refresh::RefreshLoop;
use crate::state::{SessionOutput, SessionPhase, SessionState};
use crate::view::Renderer;

/// Entry point for running a session.
pub struct Session;

impl Session {
    /// Spawn the session actor for `identifier` on the current tokio runtime.
    ///
    /// The identifier is parsed and probed immediately. Dropping every clone
    /// of the returned handle ends the session as if `close` had been called.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when `config` fails validation.
    pub fn spawn<R: Renderer>(
        client: RemoteClient,
        identifier: impl Into<String>,
        renderer: R,
        config: SessionConfig,
    ) -> SessionResult<SessionHandle> {
        config.validate()?;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let state = SessionState::new(identifier);
        let (output_tx, output_rx) = watch::channel(state.output());
        let controller = Controller::new(client, config, state, renderer, signal_tx, output_tx);
        let task = tokio::spawn(run(controller, control_rx, signal_rx));

        Ok(SessionHandle {
            control: control_tx,
            closed: Arc::new(AtomicBool::new(false)),
            output: output_rx,
            task: Arc::new(task),
        })
    }
}

async fn run<R: Renderer>(
    mut controller: Controller<R>,
    mut control: mpsc::UnboundedReceiver<Control>,
    mut signals: mpsc::UnboundedReceiver<Signal>,
) {
    let mut refresh = RefreshLoop::new(controller.refresh_interval());
    controller.begin();

    loop {
        if controller.take_refresh_request() && !refresh.is_armed() {
            refresh.arm();
        }
        if controller.phase() == SessionPhase::Terminated {
            break;
        }

        tokio::select! {
            request = control.recv() => match request {
                Some(Control::Start) => controller.start(),
                Some(Control::Close) | None => controller.close(),
            },
            Some(signal) = signals.recv() => controller.handle_signal(signal),
            () = refresh.tick() => controller.render(),
        }
    }

    refresh.cancel();
    debug!("session actor stopped");
}

/// Cloneable control surface for a running session.
#[derive(Clone)]
pub struct SessionHandle {
    control: mpsc::UnboundedSender<Control>,
    closed: Arc<AtomicBool>,
    output: watch::Receiver<SessionOutput>,
    task: Arc<JoinHandle<()>>,
}

impl SessionHandle {
    /// Ask the session to join the swarm.
    ///
    /// Ignored by the session unless the torrent is absent or a retryable
    /// error is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Terminated`] once the session has ended.
    pub fn start(&self) -> SessionResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::Terminated);
        }
        self.control
            .send(Control::Start)
            .map_err(|_| SessionError::Terminated)
    }

    /// End the session. Only the first call has any effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.control.send(Control::Close).is_err() {
            debug!("session already stopped before close");
        }
    }

    /// Receiver of the latest derived output.
    #[must_use]
    pub fn output(&self) -> watch::Receiver<SessionOutput> {
        self.output.clone()
    }

    /// Latest derived output.
    #[must_use]
    pub fn current(&self) -> SessionOutput {
        self.output.borrow().clone()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.output.borrow().phase
    }

    /// Whether the actor task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the session reaches `Terminated` or its actor is gone.
    pub async fn wait_terminated(&self) {
        let mut output = self.output.clone();
        if output
            .wait_for(|current| current.phase == SessionPhase::Terminated)
            .await
            .is_err()
        {
            debug!("session actor dropped before reporting termination");
        }
    }
}
