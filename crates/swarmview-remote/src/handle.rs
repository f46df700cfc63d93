//! Local proxy for an engine-side torrent.

use std::collections::VecDeque;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use swarmview_protocol::TorrentSnapshot;
use tokio::sync::broadcast;

use crate::subscription::Subscription;

/// Broadcast capacity for per-torrent fault events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Events a torrent handle publishes to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentEvent {
    /// Non-fatal condition reported by the engine.
    Warning {
        /// Engine-provided description.
        message: String,
    },
    /// Fault affecting this torrent.
    Error {
        /// Engine-provided description.
        message: String,
    },
}

impl TorrentEvent {
    /// Machine-friendly discriminator for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Warning { .. } => "warning",
            Self::Error { .. } => "error",
        }
    }
}

/// Cheaply cloneable proxy for a torrent the engine is running.
///
/// Clones share the snapshot and the subscriber list. The client keeps one
/// clone in its registry until the session is destroyed.
#[derive(Clone)]
pub struct TorrentHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    torrent_id: String,
    snapshot: RwLock<SnapshotSlot>,
    events: broadcast::Sender<TorrentEvent>,
    replay: Mutex<VecDeque<TorrentEvent>>,
}

struct SnapshotSlot {
    snapshot: TorrentSnapshot,
    updated_at: DateTime<Utc>,
}

impl TorrentHandle {
    pub(crate) fn new(torrent_id: impl Into<String>, snapshot: TorrentSnapshot) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(HandleInner {
                torrent_id: torrent_id.into(),
                snapshot: RwLock::new(SnapshotSlot {
                    snapshot,
                    updated_at: Utc::now(),
                }),
                events,
                replay: Mutex::new(VecDeque::with_capacity(EVENT_CHANNEL_CAPACITY)),
            }),
        }
    }

    /// Identifier the handle was registered under.
    #[must_use]
    pub fn torrent_id(&self) -> &str {
        &self.inner.torrent_id
    }

    /// Latest engine snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TorrentSnapshot {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// Local time the snapshot was last replaced.
    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .updated_at
    }

    /// Subscribe to events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<TorrentEvent> {
        Subscription::new(VecDeque::new(), self.inner.events.subscribe())
    }

    /// Subscribe and replay every event the handle has emitted so far.
    ///
    /// The backlog is copied and the receiver registered under the same lock
    /// that `emit` takes, so no event is missed or seen twice.
    #[must_use]
    pub fn subscribe_with_backlog(&self) -> Subscription<TorrentEvent> {
        let replay = self.lock_replay();
        let receiver = self.inner.events.subscribe();
        let backlog = replay.clone();
        drop(replay);
        Subscription::new(backlog, receiver)
    }

    /// Whether two handles proxy the same registry entry.
    #[must_use]
    pub fn same_torrent(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn apply_snapshot(&self, snapshot: TorrentSnapshot) {
        let mut slot = self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        slot.snapshot = snapshot;
        slot.updated_at = Utc::now();
    }

    pub(crate) fn emit(&self, event: TorrentEvent) {
        let mut replay = self.lock_replay();
        if replay.len() == EVENT_CHANNEL_CAPACITY {
            let _ = replay.pop_front();
        }
        replay.push_back(event.clone());
        let _ = self.inner.events.send(event);
    }

    fn lock_replay(&self) -> std::sync::MutexGuard<'_, VecDeque<TorrentEvent>> {
        self.inner
            .replay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for TorrentHandle {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TorrentHandle")
            .field("torrent_id", &self.inner.torrent_id)
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl PartialEq for TorrentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_torrent(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn warning(message: &str) -> TorrentEvent {
        TorrentEvent::Warning {
            message: message.into(),
        }
    }

    #[test]
    fn snapshots_replace_and_timestamp() {
        let handle = TorrentHandle::new("abc", TorrentSnapshot::default());
        let before = handle.last_updated();
        handle.apply_snapshot(TorrentSnapshot {
            name: Some("Movie".into()),
            num_peers: 4,
            ..TorrentSnapshot::default()
        });
        assert_eq!(handle.snapshot().name.as_deref(), Some("Movie"));
        assert_eq!(handle.snapshot().num_peers, 4);
        assert!(handle.last_updated() >= before);
    }

    #[tokio::test]
    async fn backlog_subscription_sees_earlier_and_later_events_once() {
        let handle = TorrentHandle::new("abc", TorrentSnapshot::default());
        handle.emit(warning("early"));

        let mut live = handle.subscribe();
        let mut replayed = handle.subscribe_with_backlog();
        handle.emit(warning("late"));

        let first = timeout(Duration::from_secs(1), replayed.next())
            .await
            .expect("replay stalled");
        let second = timeout(Duration::from_secs(1), replayed.next())
            .await
            .expect("replay stalled");
        assert_eq!(first, Some(warning("early")));
        assert_eq!(second, Some(warning("late")));

        let only = timeout(Duration::from_secs(1), live.next())
            .await
            .expect("live stalled");
        assert_eq!(only, Some(warning("late")));
    }

    #[test]
    fn clones_compare_by_identity() {
        let handle = TorrentHandle::new("abc", TorrentSnapshot::default());
        let twin = TorrentHandle::new("abc", TorrentSnapshot::default());
        assert_eq!(handle, handle.clone());
        assert_ne!(handle, twin);
        assert!(format!("{handle:?}").contains("abc"));
    }
}
