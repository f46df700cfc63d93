//! Receiver wrapper combining a replay backlog with the live broadcast stream.

use std::collections::VecDeque;

use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

/// Stream of events yielding the buffered backlog first, then live events.
pub struct Subscription<T> {
    backlog: VecDeque<T>,
    stream: BroadcastStream<T>,
}

impl<T> Subscription<T>
where
    T: Clone + Send + 'static,
{
    pub(crate) fn new(backlog: VecDeque<T>, receiver: tokio::sync::broadcast::Receiver<T>) -> Self {
        Self {
            backlog,
            stream: BroadcastStream::new(receiver),
        }
    }

    /// Receive the next event, or `None` once the publisher is gone.
    ///
    /// Lagging receivers skip the overwritten events and keep going.
    pub async fn next(&mut self) -> Option<T> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.stream.next().await? {
                Ok(event) => return Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged; events dropped");
                }
            }
        }
    }

    /// Events still waiting in the replay backlog.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}
