//! Published leaderboard documents and the read-side filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::partition::{Partition, PartitionKey, Scope, SportFilter};
use crate::ranking::{Ranking, RankingEntry};

/// A ranking ready to be written; the store assigns the timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDraft {
    pub key: PartitionKey,
    pub partition: Partition,
    pub rankings: Vec<RankingEntry>,
}

impl SnapshotDraft {
    /// Draft that clears a previously published partition.
    pub fn empty(partition: Partition) -> Self {
        Self {
            key: partition.key(),
            partition,
            rankings: Vec::new(),
        }
    }

    pub fn stamp(self, last_updated: DateTime<Utc>) -> LeaderboardSnapshot {
        LeaderboardSnapshot {
            id: self.key,
            scope: self.partition.scope,
            company: self.partition.company,
            sport_type: self.partition.sport.label().to_string(),
            rankings: self.rankings,
            last_updated,
        }
    }
}

impl From<Ranking> for SnapshotDraft {
    fn from(ranking: Ranking) -> Self {
        Self {
            key: ranking.partition.key(),
            partition: ranking.partition,
            rankings: ranking.entries,
        }
    }
}

/// Stored leaderboard for one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    pub id: PartitionKey,
    #[serde(rename = "type", alias = "scope")]
    pub scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Sport tag, or `ALL`.
    pub sport_type: String,
    #[serde(default)]
    pub rankings: Vec<RankingEntry>,
    pub last_updated: DateTime<Utc>,
}

impl LeaderboardSnapshot {
    pub fn partition(&self) -> Partition {
        Partition {
            scope: self.scope,
            company: match self.scope {
                Scope::Global => None,
                Scope::Corporate => self.company.clone(),
            },
            sport: SportFilter::from_label(&self.sport_type),
        }
    }
}

/// Read-side filter over published snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    #[serde(default, rename = "type", alias = "scope")]
    pub scope: Scope,
    /// Absent or `ALL` selects every sport.
    #[serde(default)]
    pub sport_type: Option<String>,
    /// Only applied to corporate queries.
    #[serde(default)]
    pub company: Option<String>,
}

impl LeaderboardQuery {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    pub fn with_sport(mut self, sport: impl Into<String>) -> Self {
        self.sport_type = Some(sport.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    fn sport_filter(&self) -> Option<&str> {
        self.sport_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != SportFilter::ALL)
    }

    fn company_filter(&self) -> Option<&str> {
        match self.scope {
            Scope::Corporate => self.company.as_deref().filter(|c| !c.is_empty()),
            Scope::Global => None,
        }
    }

    pub fn matches(&self, snapshot: &LeaderboardSnapshot) -> bool {
        if snapshot.scope != self.scope {
            return false;
        }
        if let Some(sport) = self.sport_filter() {
            if snapshot.sport_type != sport {
                return false;
            }
        }
        match self.company_filter() {
            Some(company) => snapshot.company.as_deref() == Some(company),
            None => true,
        }
    }
}
