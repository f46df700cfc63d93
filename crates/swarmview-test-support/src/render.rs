//! Renderer that records every frame for later assertions.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Result, anyhow};
use swarmview_session::{Renderer, SessionOutput, View};
use tokio::time::{Instant, sleep};

/// One call to [`Renderer::render`].
#[derive(Debug, Clone)]
pub struct Frame {
    /// Output handed to the renderer.
    pub output: SessionOutput,
    /// View derived from it.
    pub view: View,
}

/// Cloneable recorder; every clone sees the same frames.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingRenderer {
    /// Fresh recorder with no frames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every frame rendered so far.
    #[must_use]
    pub fn frames(&self) -> Vec<Frame> {
        self.lock().clone()
    }

    /// Number of frames rendered so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Most recent frame.
    #[must_use]
    pub fn last(&self) -> Option<Frame> {
        self.lock().last().cloned()
    }

    /// Poll until a frame satisfies `predicate`, returning it.
    ///
    /// # Errors
    ///
    /// Fails when no matching frame is rendered within `within`.
    pub async fn wait_for<F>(&self, within: Duration, predicate: F) -> Result<Frame>
    where
        F: Fn(&Frame) -> bool,
    {
        let deadline = Instant::now() + within;
        loop {
            if let Some(frame) = self.lock().iter().rev().find(|frame| predicate(*frame)) {
                return Ok(frame.clone());
            }
            if Instant::now() >= deadline {
                return Err(anyhow!("no matching frame within {within:?}"));
            }
            sleep(Duration::from_millis(5)).await;
        }
    }

    /// Poll until at least `count` frames exist.
    ///
    /// # Errors
    ///
    /// Fails when fewer frames are rendered within `within`.
    pub async fn wait_for_count(&self, count: usize, within: Duration) -> Result<()> {
        let deadline = Instant::now() + within;
        while self.count() < count {
            if Instant::now() >= deadline {
                return Err(anyhow!(
                    "expected {count} frames within {within:?}, saw {}",
                    self.count()
                ));
            }
            sleep(Duration::from_millis(5)).await;
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Frame>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, output: &SessionOutput, view: &View) {
        self.lock().push(Frame {
            output: output.clone(),
            view: view.clone(),
        });
    }
}
