//! Fixed-period re-render timer.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Timer that stays silent until armed, then ticks once per period.
#[derive(Debug)]
pub(crate) struct RefreshLoop {
    period: Duration,
    ticker: Option<Interval>,
}

impl RefreshLoop {
    pub(crate) const fn new(period: Duration) -> Self {
        Self {
            period,
            ticker: None,
        }
    }

    /// Start ticking one period from now. Arming twice keeps the first schedule.
    pub(crate) fn arm(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    pub(crate) fn cancel(&mut self) {
        self.ticker = None;
    }

    pub(crate) const fn is_armed(&self) -> bool {
        self.ticker.is_some()
    }

    /// Wait for the next tick. Never resolves while disarmed.
    pub(crate) async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
