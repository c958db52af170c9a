use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use beyondwork_activity::{EventStatus, SportEvent, StatsCredit, UserProfile};
use beyondwork_core::{Document, EventId, UserId};
use beyondwork_leaderboard::{
    LeaderboardQuery, LeaderboardSnapshot, PartitionKey, SnapshotDraft,
};

use super::{
    EventMutation, EventStore, EventUpdate, PublishedPartition, SnapshotStore, StoreError,
    StoreResult, UserStore,
};

/// In-memory store for tests/dev.
///
/// Each collection sits behind its own lock; a poisoned lock surfaces as
/// [`StoreError::Storage`].
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    events: RwLock<BTreeMap<EventId, SportEvent>>,
    users: RwLock<BTreeMap<UserId, UserProfile>>,
    snapshots: RwLock<BTreeMap<PartitionKey, LeaderboardSnapshot>>,
}

fn read<'a, T>(lock: &'a RwLock<T>, collection: &str) -> StoreResult<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| StoreError::storage(format!("{collection} lock poisoned")))
}

fn write<'a, T>(lock: &'a RwLock<T>, collection: &str) -> StoreResult<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| StoreError::storage(format!("{collection} lock poisoned")))
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryDocumentStore {
    async fn list_by_status(&self, status: EventStatus) -> StoreResult<Vec<SportEvent>> {
        let events = read(&self.events, SportEvent::COLLECTION)?;
        Ok(events.values().filter(|e| e.status == status).cloned().collect())
    }

    async fn get_event(&self, id: &EventId) -> StoreResult<Option<SportEvent>> {
        let events = read(&self.events, SportEvent::COLLECTION)?;
        Ok(events.get(id).cloned())
    }

    async fn put_event(&self, event: SportEvent) -> StoreResult<()> {
        let mut events = write(&self.events, SportEvent::COLLECTION)?;
        events.insert(event.id.clone(), event);
        Ok(())
    }

    async fn update_event(&self, id: &EventId, mutation: EventMutation) -> StoreResult<EventUpdate> {
        let mut events = write(&self.events, SportEvent::COLLECTION)?;
        let stored = events.get_mut(id).ok_or_else(|| StoreError::NotFound {
            collection: SportEvent::COLLECTION,
            id: id.to_string(),
        })?;

        let before = stored.clone();
        let mut after = before.clone();
        mutation(&mut after)?;
        *stored = after.clone();
        Ok(EventUpdate { before, after })
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryDocumentStore {
    async fn get_user(&self, id: &UserId) -> StoreResult<Option<UserProfile>> {
        let users = read(&self.users, UserProfile::COLLECTION)?;
        Ok(users.get(id).cloned())
    }

    async fn put_user(&self, profile: UserProfile) -> StoreResult<()> {
        let mut users = write(&self.users, UserProfile::COLLECTION)?;
        users.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn credit_user(&self, id: &UserId, credit: StatsCredit) -> StoreResult<bool> {
        let mut users = write(&self.users, UserProfile::COLLECTION)?;
        match users.get_mut(id) {
            Some(profile) => {
                profile.stats.apply(credit);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

const SNAPSHOTS: &str = "leaderboards";

#[async_trait::async_trait]
impl SnapshotStore for InMemoryDocumentStore {
    async fn replace_snapshot(&self, draft: SnapshotDraft) -> StoreResult<LeaderboardSnapshot> {
        let snapshot = draft.stamp(Utc::now());
        let mut snapshots = write(&self.snapshots, SNAPSHOTS)?;
        snapshots.insert(snapshot.id.clone(), snapshot.clone());
        Ok(snapshot)
    }

    async fn published_partitions(&self) -> StoreResult<Vec<PublishedPartition>> {
        let snapshots = read(&self.snapshots, SNAPSHOTS)?;
        Ok(snapshots
            .values()
            .map(|s| PublishedPartition {
                partition: s.partition(),
                entries: s.rankings.len(),
            })
            .collect())
    }

    async fn remove_snapshot(&self, key: &PartitionKey) -> StoreResult<bool> {
        let mut snapshots = write(&self.snapshots, SNAPSHOTS)?;
        Ok(snapshots.remove(key).is_some())
    }

    async fn query_snapshots(&self, query: &LeaderboardQuery) -> StoreResult<Vec<LeaderboardSnapshot>> {
        let snapshots = read(&self.snapshots, SNAPSHOTS)?;
        Ok(snapshots.values().filter(|s| query.matches(s)).cloned().collect())
    }

    async fn get_snapshot(&self, key: &PartitionKey) -> StoreResult<Option<LeaderboardSnapshot>> {
        let snapshots = read(&self.snapshots, SNAPSHOTS)?;
        Ok(snapshots.get(key).cloned())
    }
}
