//! Leaderboard aggregation runs: read completed events, rank, publish.
//!
//! - `extractor`: completed-event scan and per-run user resolution
//! - `publisher`: snapshot writes and the empty-partition policy
//! - `runner`: lock, wall-clock budget and the run report

pub mod extractor;
pub mod publisher;
pub mod runner;

pub use extractor::{ParticipationExtractor, UserDirectory};
pub use publisher::{PublishOutcome, SnapshotPublisher};
pub use runner::{LEADERBOARD_JOB, LeaderboardAggregator, RunError, RunReport, RunSettings, Trigger};
