//! Engine parameters.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Points awarded per attended event.
pub const DEFAULT_POINTS_PER_EVENT: u64 = 10;

/// Maximum number of entries kept in a single ranking.
pub const DEFAULT_MAX_RANKING_SIZE: usize = 100;

/// What a run does with partitions that end up with no entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPartitionPolicy {
    /// Write empty partitions, and overwrite previously published partitions
    /// the current run no longer produces with an empty ranking.
    PublishEmpty,
    /// Never write empty partitions; partitions from earlier runs that the
    /// current run does not produce are left as they were.
    Skip,
}

impl FromStr for EmptyPartitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publish" | "publish_empty" => Ok(Self::PublishEmpty),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown empty partition policy '{other}' (expected publish|skip)")),
        }
    }
}

/// Aggregation engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Score multiplier: `score = attended × points_per_event`.
    pub points_per_event: u64,
    /// Cap applied to every ranking; `None` keeps all entries.
    pub max_ranking_size: Option<usize>,
    pub empty_partition_policy: EmptyPartitionPolicy,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            points_per_event: DEFAULT_POINTS_PER_EVENT,
            max_ranking_size: Some(DEFAULT_MAX_RANKING_SIZE),
            empty_partition_policy: EmptyPartitionPolicy::PublishEmpty,
        }
    }
}

impl AggregationConfig {
    pub fn with_points_per_event(mut self, points: u64) -> Self {
        self.points_per_event = points;
        self
    }

    pub fn with_max_ranking_size(mut self, max: Option<usize>) -> Self {
        self.max_ranking_size = max;
        self
    }

    pub fn with_empty_partition_policy(mut self, policy: EmptyPartitionPolicy) -> Self {
        self.empty_partition_policy = policy;
        self
    }
}
