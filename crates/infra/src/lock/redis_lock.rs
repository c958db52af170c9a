//! Redis-backed run lock (`SET NX PX` + owner-checked delete).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::{LockError, LockLease, RunLock};

const KEY_PREFIX: &str = "beyondwork:lock:";

/// Deletes the key only if it still holds our owner token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Debug, Clone)]
pub struct RedisRunLock {
    client: Arc<redis::Client>,
}

impl RedisRunLock {
    /// `redis_url` e.g. `redis://localhost:6379`.
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, LockError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(backend)?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, LockError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)
    }
}

fn backend(err: redis::RedisError) -> LockError {
    LockError::Backend(err.to_string())
}

#[async_trait::async_trait]
impl RunLock for RedisRunLock {
    async fn try_acquire(&self, job: &str, ttl: Duration) -> Result<Option<LockLease>, LockError> {
        let mut conn = self.connection().await?;
        let lease = LockLease::new(job, ttl, Utc::now());
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let reply: Option<String> = redis::cmd("SET")
            .arg(format!("{KEY_PREFIX}{job}"))
            .arg(lease.owner.to_string())
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        Ok(reply.map(|_| lease))
    }

    async fn release(&self, lease: &LockLease) -> Result<bool, LockError> {
        let mut conn = self.connection().await?;
        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(format!("{KEY_PREFIX}{}", lease.job))
            .arg(lease.owner.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(deleted == 1)
    }
}
