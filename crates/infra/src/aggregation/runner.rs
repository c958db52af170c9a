use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use beyondwork_core::UserId;
use beyondwork_leaderboard::{AggregationConfig, KeyCollision, accumulate, build_rankings};

use super::extractor::{ParticipationExtractor, observed_sports};
use super::publisher::SnapshotPublisher;
use crate::lock::{LockError, RunLock};
use crate::store::{EventStore, SnapshotStore, StoreError, UserStore};

/// Lock name shared by every leaderboard run.
pub const LEADERBOARD_JOB: &str = "leaderboard-aggregation";

/// Who started a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Scheduled,
    Manual { caller: UserId },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("another leaderboard run holds the lock")]
    AlreadyRunning,

    #[error("run exceeded its {0:?} budget")]
    TimedOut(Duration),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runner limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Wall-clock budget of one run.
    pub run_timeout: Duration,
    /// Lease TTL; keep it above `run_timeout`.
    pub lock_ttl: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            run_timeout: Duration::from_secs(300),
            lock_ttl: Duration::from_secs(900),
        }
    }
}

/// Summary of one successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger: Trigger,
    pub completed_events: u64,
    pub participants: usize,
    pub user_lookups: usize,
    pub missing_users: usize,
    pub published: usize,
    pub cleared: usize,
    pub removed: usize,
    pub collisions: Vec<KeyCollision>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Runs leaderboard aggregation, one run at a time.
#[derive(Clone)]
pub struct LeaderboardAggregator {
    events: Arc<dyn EventStore>,
    users: Arc<dyn UserStore>,
    snapshots: Arc<dyn SnapshotStore>,
    lock: Arc<dyn RunLock>,
    config: AggregationConfig,
    settings: RunSettings,
}

impl LeaderboardAggregator {
    pub fn new(
        events: Arc<dyn EventStore>,
        users: Arc<dyn UserStore>,
        snapshots: Arc<dyn SnapshotStore>,
        lock: Arc<dyn RunLock>,
    ) -> Self {
        Self {
            events,
            users,
            snapshots,
            lock,
            config: AggregationConfig::default(),
            settings: RunSettings::default(),
        }
    }

    pub fn with_config(mut self, config: AggregationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Run once. Fails fast with [`RunError::AlreadyRunning`] while another
    /// run holds the lease; the lease is released however the run ends.
    pub async fn run(&self, trigger: Trigger) -> Result<RunReport, RunError> {
        let run_id = Uuid::now_v7();
        let span = info_span!("leaderboard_run", %run_id, trigger = ?trigger);

        async move {
            let lease = match self.lock.try_acquire(LEADERBOARD_JOB, self.settings.lock_ttl).await {
                Ok(Some(lease)) => lease,
                Ok(None) => {
                    warn!("leaderboard run skipped: already running");
                    return Err(RunError::AlreadyRunning);
                }
                Err(e) => {
                    error!(error = %e, "could not acquire leaderboard lock");
                    return Err(e.into());
                }
            };

            let started_at = Utc::now();
            let outcome = tokio::time::timeout(
                self.settings.run_timeout,
                self.execute(run_id, trigger, started_at),
            )
            .await
            .unwrap_or(Err(RunError::TimedOut(self.settings.run_timeout)));

            match self.lock.release(&lease).await {
                Ok(true) => {}
                Ok(false) => warn!("leaderboard lease expired before release"),
                Err(e) => warn!(error = %e, "failed to release leaderboard lock"),
            }

            match &outcome {
                Ok(report) => info!(
                    completed_events = report.completed_events,
                    participants = report.participants,
                    published = report.published,
                    cleared = report.cleared,
                    removed = report.removed,
                    collisions = report.collisions.len(),
                    "leaderboards calculated"
                ),
                Err(e) => error!(error = %e, "leaderboard run failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        trigger: Trigger,
        started_at: DateTime<Utc>,
    ) -> Result<RunReport, RunError> {
        let extractor = ParticipationExtractor::new(self.events.as_ref(), self.users.as_ref());
        let events = extractor.completed_events().await?;
        let sports = observed_sports(&events);
        let tally = accumulate(&events);

        let mut directory = extractor.directory();
        directory.resolve_all(tally.participants()).await?;
        let (user_lookups, missing_users) = (directory.lookups(), directory.missing());
        let profiles = directory.into_profiles();

        let completed_events = tally.events_counted();
        let participants = tally.participant_count();
        let summaries = tally.finalize(&profiles);
        let rankings = build_rankings(&summaries, &sports, &self.config);

        let outcome = SnapshotPublisher::new(self.snapshots.as_ref(), self.config.empty_partition_policy)
            .publish(rankings)
            .await?;

        Ok(RunReport {
            run_id,
            trigger,
            completed_events,
            participants,
            user_lookups,
            missing_users,
            published: outcome.published.len(),
            cleared: outcome.cleared.len(),
            removed: outcome.removed.len(),
            collisions: outcome.collisions,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
