//! Leased, single-owner run locks.
//!
//! A lease is identified by a job name and an owner token. It expires after
//! its TTL so a crashed holder cannot block the job forever; only the owner
//! token can release it early.

mod in_memory;
mod postgres;
#[cfg(feature = "redis")]
mod redis_lock;

pub use in_memory::InMemoryRunLock;
pub use postgres::PostgresRunLock;
#[cfg(feature = "redis")]
pub use redis_lock::RedisRunLock;

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("lock backend error: {0}")]
    Backend(String),
}

/// A held lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub job: String,
    pub owner: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl LockLease {
    pub fn new(job: impl Into<String>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            job: job.into(),
            owner: Uuid::now_v7(),
            expires_at: chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }
}

#[async_trait::async_trait]
pub trait RunLock: Send + Sync {
    /// Take the lease for `job`, or `None` while someone else holds it.
    async fn try_acquire(&self, job: &str, ttl: Duration) -> Result<Option<LockLease>, LockError>;

    /// Give the lease back. Returns `false` when it had already expired or
    /// been taken over.
    async fn release(&self, lease: &LockLease) -> Result<bool, LockError>;
}
