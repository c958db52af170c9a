use serde::{Deserialize, Serialize};

use beyondwork_auth::Role;
use beyondwork_core::{Document, UserId};

/// Participation counters kept on the user profile.
///
/// These are running totals updated when events complete; leaderboards do
/// not read them and always recount from events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub events_attended: u64,
    #[serde(default)]
    pub events_created: u64,
    #[serde(default)]
    pub communities_joined: u64,
    #[serde(default)]
    pub total_points: u64,
}

impl UserStats {
    pub fn apply(&mut self, credit: StatsCredit) {
        self.events_attended += credit.events_attended;
        self.events_created += credit.events_created;
        self.total_points += credit.points;
    }
}

/// Increment applied to [`UserStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCredit {
    pub events_attended: u64,
    pub events_created: u64,
    pub points: u64,
}

impl StatsCredit {
    /// Credit for attending a completed event.
    pub const PARTICIPATION: StatsCredit = StatsCredit {
        events_attended: 1,
        events_created: 0,
        points: 10,
    };

    /// Credit for hosting a completed event.
    pub const HOSTING: StatsCredit = StatsCredit {
        events_attended: 0,
        events_created: 1,
        points: 5,
    };
}

/// User profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub stats: UserStats,
}

impl UserProfile {
    pub fn new(id: UserId, name: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: String::new(),
            company: company.into(),
            role: Role::User,
            stats: UserStats::default(),
        }
    }

    /// Display name, if the profile has a non-blank one.
    pub fn display_name(&self) -> Option<&str> {
        Some(self.name.trim()).filter(|n| !n.is_empty())
    }

    /// Employer, if the profile has a non-blank one.
    pub fn affiliation(&self) -> Option<&str> {
        Some(self.company.trim()).filter(|c| !c.is_empty())
    }
}

impl Document for UserProfile {
    const COLLECTION: &'static str = "users";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_accumulate() {
        let mut stats = UserStats::default();
        stats.apply(StatsCredit::PARTICIPATION);
        stats.apply(StatsCredit::PARTICIPATION);
        stats.apply(StatsCredit::HOSTING);
        assert_eq!(stats.events_attended, 2);
        assert_eq!(stats.events_created, 1);
        assert_eq!(stats.total_points, 25);
    }

    #[test]
    fn blank_fields_are_not_affiliations() {
        let profile = UserProfile::new(UserId::new("u1"), "  ", " ");
        assert_eq!(profile.display_name(), None);
        assert_eq!(profile.affiliation(), None);
    }
}
