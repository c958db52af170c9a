//! Postgres-backed document store.
//!
//! Events and users are kept as JSONB documents keyed by id; snapshots keep
//! their partition columns next to the rankings so reads can filter in SQL.
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | Database, PoolClosed, Io, other | `Storage` |
//! | Document fails to deserialize | `Corrupt` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Row};
use tracing::instrument;

use beyondwork_activity::{EventStatus, SportEvent, StatsCredit, UserProfile};
use beyondwork_core::{Document, EventId, UserId};
use beyondwork_leaderboard::{
    LeaderboardQuery, LeaderboardSnapshot, Partition, PartitionKey, RankingEntry, Scope,
    SnapshotDraft, SportFilter,
};

use super::{
    EventMutation, EventStore, EventUpdate, PublishedPartition, SnapshotStore, StoreError,
    StoreResult, UserStore,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        doc JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS events_status_idx ON events (status)",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        doc JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS leaderboards (
        id TEXT PRIMARY KEY,
        scope TEXT NOT NULL,
        company TEXT,
        sport_type TEXT NOT NULL,
        rankings JSONB NOT NULL,
        last_updated TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// Postgres-backed store for all three collections.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create tables and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::storage(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::storage(format!("connection pool closed in {operation}")),
        other => StoreError::storage(format!("sqlx error in {operation}: {other}")),
    }
}

fn encode<T: Serialize>(collection: &'static str, id: &str, doc: &T) -> StoreResult<serde_json::Value> {
    serde_json::to_value(doc).map_err(|e| StoreError::Corrupt {
        collection,
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(collection: &'static str, id: &str, doc: serde_json::Value) -> StoreResult<T> {
    serde_json::from_value(doc).map_err(|e| StoreError::Corrupt {
        collection,
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn doc_row<T: DeserializeOwned>(collection: &'static str, row: &sqlx::postgres::PgRow) -> StoreResult<T> {
    let id: String = row
        .try_get("id")
        .map_err(|e| map_sqlx_error(collection, e))?;
    let doc: serde_json::Value = row
        .try_get("doc")
        .map_err(|e| map_sqlx_error(collection, e))?;
    decode(collection, &id, doc)
}

#[async_trait::async_trait]
impl EventStore for PostgresDocumentStore {
    #[instrument(skip(self), err)]
    async fn list_by_status(&self, status: EventStatus) -> StoreResult<Vec<SportEvent>> {
        let rows = sqlx::query("SELECT id, doc FROM events WHERE status = $1 ORDER BY id ASC")
            .bind(status.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_by_status", e))?;

        rows.iter()
            .map(|row| doc_row(SportEvent::COLLECTION, row))
            .collect()
    }

    async fn get_event(&self, id: &EventId) -> StoreResult<Option<SportEvent>> {
        let row = sqlx::query("SELECT id, doc FROM events WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_event", e))?;

        row.as_ref()
            .map(|r| doc_row(SportEvent::COLLECTION, r))
            .transpose()
    }

    async fn put_event(&self, event: SportEvent) -> StoreResult<()> {
        let doc = encode(SportEvent::COLLECTION, event.id.as_str(), &event)?;
        sqlx::query(
            r#"
            INSERT INTO events (id, status, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (id)
            DO UPDATE SET
                status = EXCLUDED.status,
                doc = EXCLUDED.doc,
                updated_at = NOW()
            "#,
        )
        .bind(event.id.as_str())
        .bind(event.status.as_str())
        .bind(doc)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_event", e))?;
        Ok(())
    }

    #[instrument(skip(self, mutation), fields(event_id = %id), err)]
    async fn update_event(&self, id: &EventId, mutation: EventMutation) -> StoreResult<EventUpdate> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_event.begin", e))?;

        let row = sqlx::query("SELECT id, doc FROM events WHERE id = $1 FOR UPDATE")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_event.select", e))?
            .ok_or_else(|| StoreError::NotFound {
                collection: SportEvent::COLLECTION,
                id: id.to_string(),
            })?;

        let before: SportEvent = doc_row(SportEvent::COLLECTION, &row)?;
        let mut after = before.clone();
        // Dropping `tx` on the error path rolls back and releases the row lock.
        mutation(&mut after)?;

        let doc = encode(SportEvent::COLLECTION, id.as_str(), &after)?;
        sqlx::query("UPDATE events SET status = $2, doc = $3, updated_at = NOW() WHERE id = $1")
            .bind(id.as_str())
            .bind(after.status.as_str())
            .bind(doc)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_event.update", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_event.commit", e))?;

        Ok(EventUpdate { before, after })
    }
}

#[async_trait::async_trait]
impl UserStore for PostgresDocumentStore {
    async fn get_user(&self, id: &UserId) -> StoreResult<Option<UserProfile>> {
        let row = sqlx::query("SELECT id, doc FROM users WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;

        row.as_ref()
            .map(|r| doc_row(UserProfile::COLLECTION, r))
            .transpose()
    }

    async fn put_user(&self, profile: UserProfile) -> StoreResult<()> {
        let doc = encode(UserProfile::COLLECTION, profile.id.as_str(), &profile)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, doc)
            VALUES ($1, $2)
            ON CONFLICT (id)
            DO UPDATE SET doc = EXCLUDED.doc, updated_at = NOW()
            "#,
        )
        .bind(profile.id.as_str())
        .bind(doc)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("put_user", e))?;
        Ok(())
    }

    async fn credit_user(&self, id: &UserId, credit: StatsCredit) -> StoreResult<bool> {
        // Increment in SQL so concurrent completions do not lose updates.
        let result = sqlx::query(
            r#"
            UPDATE users SET
                doc = jsonb_set(
                    jsonb_set(
                        jsonb_set(
                            jsonb_set(doc, '{stats}', COALESCE(NULLIF(doc->'stats', 'null'::jsonb), '{}'::jsonb)),
                            '{stats,eventsAttended}',
                            to_jsonb(COALESCE((doc #>> '{stats,eventsAttended}')::BIGINT, 0) + $2)
                        ),
                        '{stats,eventsCreated}',
                        to_jsonb(COALESCE((doc #>> '{stats,eventsCreated}')::BIGINT, 0) + $3)
                    ),
                    '{stats,totalPoints}',
                    to_jsonb(COALESCE((doc #>> '{stats,totalPoints}')::BIGINT, 0) + $4)
                ),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(i64::try_from(credit.events_attended).unwrap_or(i64::MAX))
        .bind(i64::try_from(credit.events_created).unwrap_or(i64::MAX))
        .bind(i64::try_from(credit.points).unwrap_or(i64::MAX))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("credit_user", e))?;

        Ok(result.rows_affected() > 0)
    }
}

const SNAPSHOTS: &str = "leaderboards";

fn snapshot_row(row: &sqlx::postgres::PgRow) -> StoreResult<LeaderboardSnapshot> {
    let get_err = |e| map_sqlx_error("snapshot_row", e);
    let id: String = row.try_get("id").map_err(get_err)?;
    let scope: String = row.try_get("scope").map_err(get_err)?;
    let company: Option<String> = row.try_get("company").map_err(get_err)?;
    let sport_type: String = row.try_get("sport_type").map_err(get_err)?;
    let rankings: serde_json::Value = row.try_get("rankings").map_err(get_err)?;
    let last_updated: DateTime<Utc> = row.try_get("last_updated").map_err(get_err)?;

    let scope = Scope::parse(&scope).ok_or_else(|| StoreError::Corrupt {
        collection: SNAPSHOTS,
        id: id.clone(),
        reason: format!("unknown scope '{scope}'"),
    })?;
    let rankings: Vec<RankingEntry> = decode(SNAPSHOTS, &id, rankings)?;

    Ok(LeaderboardSnapshot {
        id: PartitionKey::new(id),
        scope,
        company,
        sport_type,
        rankings,
        last_updated,
    })
}

#[async_trait::async_trait]
impl SnapshotStore for PostgresDocumentStore {
    #[instrument(skip(self, draft), fields(key = %draft.key), err)]
    async fn replace_snapshot(&self, draft: SnapshotDraft) -> StoreResult<LeaderboardSnapshot> {
        let rankings = encode(SNAPSHOTS, draft.key.as_str(), &draft.rankings)?;
        let row = sqlx::query(
            r#"
            INSERT INTO leaderboards (id, scope, company, sport_type, rankings, last_updated)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (id)
            DO UPDATE SET
                scope = EXCLUDED.scope,
                company = EXCLUDED.company,
                sport_type = EXCLUDED.sport_type,
                rankings = EXCLUDED.rankings,
                last_updated = EXCLUDED.last_updated
            RETURNING last_updated
            "#,
        )
        .bind(draft.key.as_str())
        .bind(draft.partition.scope.as_str())
        .bind(draft.partition.company.as_deref())
        .bind(draft.partition.sport.label())
        .bind(rankings)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("replace_snapshot", e))?;

        let last_updated: DateTime<Utc> = row
            .try_get("last_updated")
            .map_err(|e| map_sqlx_error("replace_snapshot", e))?;
        Ok(draft.stamp(last_updated))
    }

    async fn published_partitions(&self) -> StoreResult<Vec<PublishedPartition>> {
        let rows = sqlx::query(
            r#"
            SELECT scope, company, sport_type, jsonb_array_length(rankings) AS entries
            FROM leaderboards
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("published_partitions", e))?;

        let mut partitions = Vec::with_capacity(rows.len());
        for row in rows {
            let get_err = |e| map_sqlx_error("published_partitions", e);
            let scope: String = row.try_get("scope").map_err(get_err)?;
            let company: Option<String> = row.try_get("company").map_err(get_err)?;
            let sport_type: String = row.try_get("sport_type").map_err(get_err)?;
            let entries: i32 = row.try_get("entries").map_err(get_err)?;
            let Some(scope) = Scope::parse(&scope) else {
                tracing::warn!(scope = %scope, "skipping snapshot with unknown scope");
                continue;
            };
            partitions.push(PublishedPartition {
                partition: Partition {
                    scope,
                    company: if scope == Scope::Corporate { company } else { None },
                    sport: SportFilter::from_label(&sport_type),
                },
                entries: usize::try_from(entries).unwrap_or(0),
            });
        }
        Ok(partitions)
    }

    #[instrument(skip(self), fields(key = %key), err)]
    async fn remove_snapshot(&self, key: &PartitionKey) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM leaderboards WHERE id = $1")
            .bind(key.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_snapshot", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn query_snapshots(&self, query: &LeaderboardQuery) -> StoreResult<Vec<LeaderboardSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT id, scope, company, sport_type, rankings, last_updated
            FROM leaderboards
            WHERE scope = $1
            ORDER BY id ASC
            "#,
        )
        .bind(query.scope.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_snapshots", e))?;

        // Sport and company filters share `LeaderboardQuery::matches` with the
        // in-memory store.
        let mut found = Vec::new();
        for row in &rows {
            let snapshot = snapshot_row(row)?;
            if query.matches(&snapshot) {
                found.push(snapshot);
            }
        }
        Ok(found)
    }

    async fn get_snapshot(&self, key: &PartitionKey) -> StoreResult<Option<LeaderboardSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT id, scope, company, sport_type, rankings, last_updated
            FROM leaderboards
            WHERE id = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_snapshot", e))?;

        row.as_ref().map(snapshot_row).transpose()
    }
}
