//! Document storage for events, user profiles and leaderboard snapshots.
//!
//! Every operation may suspend. Implementations:
//! - [`InMemoryDocumentStore`]: tests and local runs
//! - [`PostgresDocumentStore`]: JSONB documents in Postgres

mod in_memory;
mod postgres;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

use thiserror::Error;

use beyondwork_activity::{EventStatus, SportEvent, StatsCredit, UserProfile};
use beyondwork_core::{DomainError, DomainResult, EventId, UserId};
use beyondwork_leaderboard::{
    LeaderboardQuery, LeaderboardSnapshot, Partition, PartitionKey, SnapshotDraft,
};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: &'static str, id: String },

    /// A mutation refused to apply.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error("corrupt document {collection}/{id}: {reason}")]
    Corrupt {
        collection: &'static str,
        id: String,
        reason: String,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// In-place change applied to one event under the store's write guard.
pub type EventMutation = Box<dyn FnOnce(&mut SportEvent) -> DomainResult<()> + Send>;

pub fn mutation<F>(f: F) -> EventMutation
where
    F: FnOnce(&mut SportEvent) -> DomainResult<()> + Send + 'static,
{
    Box::new(f)
}

/// An event before and after a successful [`EventStore::update_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventUpdate {
    pub before: SportEvent,
    pub after: SportEvent,
}

/// A stored snapshot's partition and how many entries it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPartition {
    pub partition: Partition,
    pub entries: usize,
}

#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Every event currently in `status`, ordered by id.
    async fn list_by_status(&self, status: EventStatus) -> StoreResult<Vec<SportEvent>>;

    async fn get_event(&self, id: &EventId) -> StoreResult<Option<SportEvent>>;

    async fn put_event(&self, event: SportEvent) -> StoreResult<()>;

    /// Apply `mutation` atomically. Nothing is written when it fails.
    async fn update_event(&self, id: &EventId, mutation: EventMutation) -> StoreResult<EventUpdate>;
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: &UserId) -> StoreResult<Option<UserProfile>>;

    async fn put_user(&self, profile: UserProfile) -> StoreResult<()>;

    /// Add `credit` to the user's stats. Returns `false` if the user is unknown.
    async fn credit_user(&self, id: &UserId, credit: StatsCredit) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Overwrite the snapshot under `draft.key`, stamping it with the store's clock.
    async fn replace_snapshot(&self, draft: SnapshotDraft) -> StoreResult<LeaderboardSnapshot>;

    /// Partitions of every stored snapshot.
    async fn published_partitions(&self) -> StoreResult<Vec<PublishedPartition>>;

    /// Delete the snapshot under `key`. Returns `false` if there was none.
    async fn remove_snapshot(&self, key: &PartitionKey) -> StoreResult<bool>;

    /// Snapshots matching `query`, ordered by key.
    async fn query_snapshots(&self, query: &LeaderboardQuery) -> StoreResult<Vec<LeaderboardSnapshot>>;

    async fn get_snapshot(&self, key: &PartitionKey) -> StoreResult<Option<LeaderboardSnapshot>>;
}
