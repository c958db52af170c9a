//! Backend wiring: in-memory for tests and local runs, Postgres when
//! `DATABASE_URL` is set.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use beyondwork_auth::Role;
use beyondwork_infra::{
    aggregation::LeaderboardAggregator,
    config::LeaderboardSettings,
    lifecycle::EventLifecycle,
    lock::{InMemoryRunLock, LockError, PostgresRunLock, RunLock},
    store::{EventStore, InMemoryDocumentStore, PostgresDocumentStore, SnapshotStore, StoreError, UserStore},
};

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lock(#[from] LockError),
}

pub struct AppServices {
    pub events: Arc<dyn EventStore>,
    pub users: Arc<dyn UserStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub aggregator: Arc<LeaderboardAggregator>,
    pub lifecycle: EventLifecycle,
    /// Lowest role allowed to trigger a manual recalculation.
    pub trigger_min_role: Role,
}

impl AppServices {
    pub fn from_parts(
        events: Arc<dyn EventStore>,
        users: Arc<dyn UserStore>,
        snapshots: Arc<dyn SnapshotStore>,
        lock: Arc<dyn RunLock>,
        settings: &LeaderboardSettings,
        trigger_min_role: Role,
    ) -> Self {
        let aggregator = LeaderboardAggregator::new(events.clone(), users.clone(), snapshots.clone(), lock)
            .with_config(settings.aggregation.clone())
            .with_settings(settings.run);
        Self {
            lifecycle: EventLifecycle::new(events.clone(), users.clone()),
            aggregator: Arc::new(aggregator),
            events,
            users,
            snapshots,
            trigger_min_role,
        }
    }

    pub fn in_memory(settings: &LeaderboardSettings, trigger_min_role: Role) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new());
        Self::from_parts(
            store.clone(),
            store.clone(),
            store,
            Arc::new(InMemoryRunLock::new()),
            settings,
            trigger_min_role,
        )
    }

    pub async fn connect(config: &ApiConfig) -> Result<Self, StartupError> {
        let settings = &config.infra.leaderboard;
        let Some(database_url) = config.infra.storage.database_url.as_deref() else {
            tracing::info!("DATABASE_URL not set; using in-memory stores");
            return Ok(Self::in_memory(settings, config.manual_trigger_min_role));
        };

        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        let store = Arc::new(PostgresDocumentStore::new(pool.clone()));
        store.ensure_schema().await?;

        let lock = run_lock(config, pool).await?;
        tracing::info!("connected to postgres");

        Ok(Self::from_parts(
            store.clone(),
            store.clone(),
            store,
            lock,
            settings,
            config.manual_trigger_min_role,
        ))
    }
}

async fn run_lock(config: &ApiConfig, pool: sqlx::PgPool) -> Result<Arc<dyn RunLock>, StartupError> {
    if let Some(redis_url) = config.infra.storage.redis_url.as_deref() {
        #[cfg(feature = "redis")]
        {
            tracing::info!("using redis run lock");
            let lock = beyondwork_infra::lock::RedisRunLock::new(redis_url)?;
            return Ok(Arc::new(lock));
        }
        #[cfg(not(feature = "redis"))]
        {
            let _ = redis_url;
            tracing::warn!("REDIS_URL set but redis feature not enabled, falling back to postgres lock");
        }
    }

    let lock = PostgresRunLock::new(pool);
    lock.ensure_schema().await?;
    Ok(Arc::new(lock))
}
