use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use beyondwork_core::{Document, DomainError, DomainResult, EventId, SportType, UserId};

use crate::profile::StatsCredit;

/// Lifecycle status of an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "UPCOMING",
            EventStatus::Ongoing => "ONGOING",
            EventStatus::Completed => "COMPLETED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "UPCOMING" => Some(EventStatus::Upcoming),
            "ONGOING" => Some(EventStatus::Ongoing),
            "COMPLETED" => Some(EventStatus::Completed),
            "CANCELLED" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Cancelled)
    }

    /// Whether `self -> to` is a legal lifecycle move.
    pub fn can_move_to(&self, to: EventStatus) -> bool {
        matches!(
            (self, to),
            (EventStatus::Upcoming, EventStatus::Ongoing)
                | (EventStatus::Upcoming, EventStatus::Completed)
                | (EventStatus::Upcoming, EventStatus::Cancelled)
                | (EventStatus::Ongoing, EventStatus::Completed)
                | (EventStatus::Ongoing, EventStatus::Cancelled)
        )
    }
}

impl core::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled sport activity.
///
/// Stored with camelCase field names; `sportType` and `company` may be absent
/// on older documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportEvent {
    pub id: EventId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sport_type: Option<String>,
    pub created_by: UserId,
    #[serde(default)]
    pub company: Option<String>,
    pub status: EventStatus,
    #[serde(default)]
    pub participants: Vec<UserId>,
    pub max_participants: u32,
    #[serde(default)]
    pub date_time: Option<DateTime<Utc>>,
}

/// Outcome of a successful lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub from: EventStatus,
    pub to: EventStatus,
}

impl StatusChange {
    /// True when this change moved the event into COMPLETED.
    pub fn completed(&self) -> bool {
        self.to == EventStatus::Completed && self.from != EventStatus::Completed
    }
}

impl SportEvent {
    pub fn new(
        id: EventId,
        created_by: UserId,
        sport_type: Option<String>,
        max_participants: u32,
    ) -> Self {
        Self {
            id,
            title: String::new(),
            sport_type,
            created_by,
            company: None,
            status: EventStatus::Upcoming,
            participants: Vec::new(),
            max_participants,
            date_time: None,
        }
    }

    /// Sport bucket of the event (`OTHER` when untagged).
    pub fn sport(&self) -> SportType {
        SportType::from_raw(self.sport_type.as_deref())
    }

    /// Hosting company, if set and non-blank.
    pub fn host_company(&self) -> Option<&str> {
        self.company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.contains(user_id)
    }

    /// Add `user_id` to the roster.
    ///
    /// The roster keeps set semantics: a second join by the same user is a
    /// conflict, never a duplicate entry.
    pub fn join(&mut self, user_id: UserId) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::Closed(self.status.to_string()));
        }
        if self.has_participant(&user_id) {
            return Err(DomainError::conflict("you have already joined this event"));
        }
        if self.participants.len() >= self.max_participants as usize {
            return Err(DomainError::CapacityReached {
                capacity: self.max_participants,
            });
        }
        self.participants.push(user_id);
        Ok(())
    }

    /// Move the event to `to`.
    pub fn transition(&mut self, to: EventStatus) -> DomainResult<StatusChange> {
        if !self.status.can_move_to(to) {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        let change = StatusChange {
            from: self.status,
            to,
        };
        self.status = to;
        Ok(change)
    }

    /// Stats owed to users once this event is COMPLETED.
    ///
    /// Each distinct participant gets a participation credit and the creator
    /// gets a hosting credit. Returns nothing for events in any other state.
    pub fn completion_credits(&self) -> Vec<(UserId, StatsCredit)> {
        if self.status != EventStatus::Completed {
            return Vec::new();
        }
        let mut seen = std::collections::HashSet::new();
        let mut credits: Vec<(UserId, StatsCredit)> = self
            .participants
            .iter()
            .filter(|p| seen.insert(*p))
            .map(|p| (p.clone(), StatsCredit::PARTICIPATION))
            .collect();
        credits.push((self.created_by.clone(), StatsCredit::HOSTING));
        credits
    }
}

impl Document for SportEvent {
    const COLLECTION: &'static str = "events";
}
