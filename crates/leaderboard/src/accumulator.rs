//! Per-user tallies folded from completed-event rosters.
//!
//! The fold is commutative: events may arrive in any order (or in shards
//! merged later) and produce the same [`Tally`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use beyondwork_core::{EventId, SportType, UserId};

use crate::partition::SportFilter;

/// Display name used when a participant has no user record.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// The part of a completed event the engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedEvent {
    pub id: EventId,
    pub sport: SportType,
    /// Company the event was hosted under, if any.
    pub company: Option<String>,
    pub participants: Vec<UserId>,
}

/// User attributes resolved from the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub display_name: String,
    /// Non-blank profile company; `None` falls back to hosted events.
    pub company: Option<String>,
}

impl ResolvedProfile {
    pub fn new(display_name: impl Into<String>, company: Option<String>) -> Self {
        Self {
            display_name: display_name.into(),
            company: company.filter(|c| !c.trim().is_empty()),
        }
    }

    /// Stand-in for a participant whose user record is missing.
    pub fn unknown() -> Self {
        Self {
            display_name: UNKNOWN_DISPLAY_NAME.to_string(),
            company: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UserTally {
    events_attended: u64,
    by_sport: BTreeMap<SportType, u64>,
    /// Host company of the smallest-id attended event that has one.
    host_fallback: Option<(EventId, String)>,
}

impl UserTally {
    fn offer_host(&mut self, event: &EventId, company: &str) {
        let replace = match &self.host_fallback {
            Some((current, _)) => event < current,
            None => true,
        };
        if replace {
            self.host_fallback = Some((event.clone(), company.to_string()));
        }
    }

    fn merge(&mut self, other: UserTally) {
        self.events_attended += other.events_attended;
        for (sport, count) in other.by_sport {
            *self.by_sport.entry(sport).or_default() += count;
        }
        if let Some((event, company)) = other.host_fallback {
            self.offer_host(&event, &company);
        }
    }
}

/// Attendance counts keyed by user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    users: BTreeMap<UserId, UserTally>,
    events: u64,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one completed event. A participant listed twice counts once.
    pub fn record(&mut self, event: &CompletedEvent) {
        self.events += 1;
        let host = event
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let roster: BTreeSet<&UserId> = event.participants.iter().collect();
        for user in roster {
            let tally = self.users.entry(user.clone()).or_default();
            tally.events_attended += 1;
            *tally.by_sport.entry(event.sport.clone()).or_default() += 1;
            if let Some(company) = host {
                tally.offer_host(&event.id, company);
            }
        }
    }

    /// Combine two partial tallies built from disjoint event sets.
    pub fn merge(&mut self, other: Tally) {
        self.events += other.events;
        for (user, tally) in other.users {
            self.users.entry(user).or_default().merge(tally);
        }
    }

    pub fn events_counted(&self) -> u64 {
        self.events
    }

    pub fn participant_count(&self) -> usize {
        self.users.len()
    }

    pub fn participants(&self) -> impl Iterator<Item = &UserId> {
        self.users.keys()
    }

    /// Attach resolved profiles and produce one summary per participant.
    ///
    /// Participants absent from `profiles` are treated as
    /// [`ResolvedProfile::unknown`]. Company is the profile company, else the
    /// host company fallback, else empty.
    pub fn finalize(self, profiles: &HashMap<UserId, ResolvedProfile>) -> Vec<UserAccountSummary> {
        let unknown = ResolvedProfile::unknown();
        self.users
            .into_iter()
            .map(|(user_id, tally)| {
                let profile = profiles.get(&user_id).unwrap_or(&unknown);
                let company = profile
                    .company
                    .clone()
                    .or_else(|| tally.host_fallback.map(|(_, company)| company))
                    .unwrap_or_default();
                UserAccountSummary {
                    user_id,
                    display_name: profile.display_name.clone(),
                    company,
                    events_attended: tally.events_attended,
                    by_sport: tally.by_sport,
                }
            })
            .collect()
    }
}

/// Fold completed events into a [`Tally`].
pub fn accumulate<'a, I>(events: I) -> Tally
where
    I: IntoIterator<Item = &'a CompletedEvent>,
{
    let mut tally = Tally::new();
    for event in events {
        tally.record(event);
    }
    tally
}

/// Everything ranking needs to know about one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccountSummary {
    pub user_id: UserId,
    pub display_name: String,
    /// Empty when neither profile nor hosted events name a company.
    pub company: String,
    pub events_attended: u64,
    pub by_sport: BTreeMap<SportType, u64>,
}

impl UserAccountSummary {
    /// Events attended within a sport filter.
    pub fn attended(&self, filter: &SportFilter) -> u64 {
        match filter {
            SportFilter::All => self.events_attended,
            SportFilter::Sport(sport) => self.by_sport.get(sport).copied().unwrap_or(0),
        }
    }
}
