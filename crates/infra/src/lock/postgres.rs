use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use super::{LockError, LockLease, RunLock};

/// Lease table shared by every API instance pointing at the same database.
#[derive(Debug, Clone)]
pub struct PostgresRunLock {
    pool: Arc<PgPool>,
}

impl PostgresRunLock {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), LockError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job_leases (
                job TEXT PRIMARY KEY,
                owner UUID NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

fn backend(err: sqlx::Error) -> LockError {
    LockError::Backend(err.to_string())
}

#[async_trait::async_trait]
impl RunLock for PostgresRunLock {
    #[instrument(skip(self), err)]
    async fn try_acquire(&self, job: &str, ttl: Duration) -> Result<Option<LockLease>, LockError> {
        let lease = LockLease::new(job, ttl, Utc::now());

        // Insert, or take over a row whose lease has run out. A live lease
        // matches neither branch and returns no row.
        let row = sqlx::query(
            r#"
            INSERT INTO job_leases (job, owner, expires_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3))
            ON CONFLICT (job)
            DO UPDATE SET
                owner = EXCLUDED.owner,
                expires_at = EXCLUDED.expires_at
            WHERE job_leases.expires_at <= NOW()
            RETURNING expires_at
            "#,
        )
        .bind(&lease.job)
        .bind(lease.owner)
        .bind(ttl.as_secs_f64())
        .fetch_optional(&*self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => {
                let expires_at: DateTime<Utc> = row.try_get("expires_at").map_err(backend)?;
                Ok(Some(LockLease { expires_at, ..lease }))
            }
            None => Ok(None),
        }
    }

    async fn release(&self, lease: &LockLease) -> Result<bool, LockError> {
        let result = sqlx::query("DELETE FROM job_leases WHERE job = $1 AND owner = $2")
            .bind(&lease.job)
            .bind(lease.owner)
            .execute(&*self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}
