use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;

use super::{LockError, LockLease, RunLock};

/// Process-local lock for tests/dev and single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryRunLock {
    leases: Mutex<HashMap<String, LockLease>>,
}

impl InMemoryRunLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RunLock for InMemoryRunLock {
    async fn try_acquire(&self, job: &str, ttl: Duration) -> Result<Option<LockLease>, LockError> {
        let now = Utc::now();
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| LockError::Backend("lease table poisoned".to_string()))?;

        if let Some(current) = leases.get(job) {
            if current.expires_at > now {
                return Ok(None);
            }
        }

        let lease = LockLease::new(job, ttl, now);
        leases.insert(job.to_string(), lease.clone());
        Ok(Some(lease))
    }

    async fn release(&self, lease: &LockLease) -> Result<bool, LockError> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| LockError::Backend("lease table poisoned".to_string()))?;

        match leases.get(&lease.job) {
            Some(current) if current.owner == lease.owner => {
                leases.remove(&lease.job);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
