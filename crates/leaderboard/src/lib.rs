//! `beyondwork-leaderboard`: the leaderboard aggregation engine (pure part).
//!
//! The engine turns the roster of every COMPLETED event into ranked,
//! partitioned standings:
//!
//! - [`accumulator`]: order-independent fold of (event, participant) pairs
//!   into per-user tallies
//! - [`ranking`]: ranked lists for every partition (global/corporate ×
//!   all/per-sport)
//! - [`partition`]: partition identity and the deterministic storage key
//! - [`snapshot`]: the published document and the read-side query
//!
//! Reading events, resolving users and writing snapshots is IO and lives in
//! `beyondwork-infra`; nothing here suspends or touches storage.

pub mod accumulator;
pub mod config;
pub mod partition;
pub mod ranking;
pub mod snapshot;

pub use accumulator::{
    CompletedEvent, ResolvedProfile, Tally, UNKNOWN_DISPLAY_NAME, UserAccountSummary, accumulate,
};
pub use config::{AggregationConfig, EmptyPartitionPolicy};
pub use partition::{KeyCollision, Partition, PartitionKey, Scope, SportFilter, dedupe_keys, slugify};
pub use ranking::{Ranking, RankingEntry, build_rankings};
pub use snapshot::{LeaderboardQuery, LeaderboardSnapshot, SnapshotDraft};
