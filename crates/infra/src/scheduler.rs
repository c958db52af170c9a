//! Daily leaderboard schedule.

use core::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::aggregation::{LeaderboardAggregator, Trigger};

/// A fixed time of day, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn midnight() -> Self {
        Self { at: NaiveTime::MIN }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today > now {
            today
        } else {
            today.checked_add_days(Days::new(1)).unwrap_or(DateTime::<Utc>::MAX_UTC)
        }
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self::midnight()
    }
}

impl FromStr for DailySchedule {
    type Err = String;

    /// `HH:MM` or `HH:MM:SS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(Self::new)
            .map_err(|_| format!("invalid daily schedule '{s}' (expected HH:MM, UTC)"))
    }
}

/// Handle to a running scheduler task.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop waiting for the next fire time. A run in progress finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.join.await;
    }
}

/// Spawn a task that runs aggregation once a day.
pub fn spawn_daily(aggregator: Arc<LeaderboardAggregator>, schedule: DailySchedule) -> SchedulerHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let join = tokio::spawn(async move {
        info!(at = %schedule.at(), "leaderboard scheduler started");
        loop {
            let now = Utc::now();
            let next = schedule.next_after(now);
            let wait = (next - now).to_std().unwrap_or_default();
            debug!(next_run = %next, "waiting for next scheduled run");

            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = tokio::time::sleep(wait) => {}
            }

            // The runner logs its own outcome.
            let _ = aggregator.run(Trigger::Scheduled).await;
        }
        info!("leaderboard scheduler stopped");
    });

    SchedulerHandle {
        shutdown: shutdown_tx,
        join,
    }
}
