use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use beyondwork_leaderboard::{
    EmptyPartitionPolicy, KeyCollision, Partition, PartitionKey, Ranking, Scope, SnapshotDraft,
    SportFilter, dedupe_keys,
};

use crate::store::{PublishedPartition, SnapshotStore, StoreResult};

/// What a publish pass wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Partitions written from this run's rankings.
    pub published: Vec<PartitionKey>,
    /// Earlier partitions this run no longer produces, overwritten empty.
    pub cleared: Vec<PartitionKey>,
    /// Earlier corporate per-sport partitions this run no longer produces, deleted.
    pub removed: Vec<PartitionKey>,
    pub collisions: Vec<KeyCollision>,
}

/// Writes rankings as full-replacement snapshots.
///
/// Writes are per key with no cross-partition transaction: the first failed
/// write aborts the pass and earlier writes stay in place.
pub struct SnapshotPublisher<'a> {
    store: &'a dyn SnapshotStore,
    policy: EmptyPartitionPolicy,
}

impl<'a> SnapshotPublisher<'a> {
    pub fn new(store: &'a dyn SnapshotStore, policy: EmptyPartitionPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn publish(&self, rankings: Vec<Ranking>) -> StoreResult<PublishOutcome> {
        let (rankings, collisions) = dedupe_keys(rankings, |r| &r.partition);
        for collision in &collisions {
            warn!(
                key = %collision.key,
                kept = %collision.kept,
                dropped = %collision.dropped,
                "partition key collision; dropped partition not published"
            );
        }

        let mut outcome = PublishOutcome {
            collisions,
            ..PublishOutcome::default()
        };

        for ranking in rankings {
            let draft = SnapshotDraft::from(ranking);
            let key = draft.key.clone();
            let entries = draft.rankings.len();
            self.store.replace_snapshot(draft).await?;
            debug!(key = %key, entries, "published leaderboard");
            outcome.published.push(key);
        }

        if self.policy == EmptyPartitionPolicy::PublishEmpty {
            let written: BTreeSet<&PartitionKey> = outcome.published.iter().collect();
            let stale: Vec<PublishedPartition> = self
                .store
                .published_partitions()
                .await?
                .into_iter()
                .filter(|p| !written.contains(&p.partition.key()))
                .collect();

            let (mut cleared, mut removed) = (Vec::new(), Vec::new());
            for PublishedPartition { partition, entries } in stale {
                if is_corporate_sport(&partition) {
                    let key = partition.key();
                    self.store.remove_snapshot(&key).await?;
                    removed.push(key);
                } else if entries > 0 {
                    let draft = SnapshotDraft::empty(partition);
                    let key = draft.key.clone();
                    self.store.replace_snapshot(draft).await?;
                    cleared.push(key);
                }
            }
            if !cleared.is_empty() || !removed.is_empty() {
                info!(
                    cleared = cleared.len(),
                    removed = removed.len(),
                    "retired stale leaderboards"
                );
            }
            outcome.cleared = cleared;
            outcome.removed = removed;
        }

        Ok(outcome)
    }
}

/// Corporate per-sport boards only exist while the company has attendance.
fn is_corporate_sport(partition: &Partition) -> bool {
    partition.scope == Scope::Corporate && partition.sport != SportFilter::All
}
