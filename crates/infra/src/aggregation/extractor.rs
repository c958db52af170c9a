use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use beyondwork_activity::{EventStatus, SportEvent};
use beyondwork_core::{SportType, UserId};
use beyondwork_leaderboard::{CompletedEvent, ResolvedProfile, UNKNOWN_DISPLAY_NAME};

use crate::store::{EventStore, StoreResult, UserStore};

/// Read side of a run. Never writes.
pub struct ParticipationExtractor<'a> {
    events: &'a dyn EventStore,
    users: &'a dyn UserStore,
}

impl<'a> ParticipationExtractor<'a> {
    pub fn new(events: &'a dyn EventStore, users: &'a dyn UserStore) -> Self {
        Self { events, users }
    }

    /// Every COMPLETED event, reduced to what ranking reads.
    pub async fn completed_events(&self) -> StoreResult<Vec<CompletedEvent>> {
        let events = self.events.list_by_status(EventStatus::Completed).await?;
        debug!(count = events.len(), "loaded completed events");
        Ok(events.into_iter().map(to_completed).collect())
    }

    /// A fresh lookup cache for one run.
    pub fn directory(&self) -> UserDirectory<'a> {
        UserDirectory {
            users: self.users,
            resolved: HashMap::new(),
            lookups: 0,
            missing: 0,
        }
    }
}

fn to_completed(event: SportEvent) -> CompletedEvent {
    CompletedEvent {
        sport: event.sport(),
        company: event.host_company().map(str::to_string),
        id: event.id,
        participants: event.participants,
    }
}

/// Sports of all completed events, including those nobody attended.
pub fn observed_sports(events: &[CompletedEvent]) -> BTreeSet<SportType> {
    events.iter().map(|e| e.sport.clone()).collect()
}

/// Per-run user lookup cache.
///
/// Each user is fetched at most once; the cache is dropped with the run.
pub struct UserDirectory<'a> {
    users: &'a dyn UserStore,
    resolved: HashMap<UserId, ResolvedProfile>,
    lookups: usize,
    missing: usize,
}

impl UserDirectory<'_> {
    /// Resolve `id`, substituting [`ResolvedProfile::unknown`] for a missing record.
    pub async fn resolve(&mut self, id: &UserId) -> StoreResult<&ResolvedProfile> {
        if !self.resolved.contains_key(id) {
            self.lookups += 1;
            let profile = match self.users.get_user(id).await? {
                Some(profile) => ResolvedProfile::new(
                    profile.display_name().unwrap_or(UNKNOWN_DISPLAY_NAME),
                    profile.affiliation().map(str::to_string),
                ),
                None => {
                    self.missing += 1;
                    debug!(user_id = %id, "participant has no user record");
                    ResolvedProfile::unknown()
                }
            };
            self.resolved.insert(id.clone(), profile);
        }
        Ok(&self.resolved[id])
    }

    pub async fn resolve_all<'i, I>(&mut self, ids: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = &'i UserId>,
    {
        for id in ids {
            self.resolve(id).await?;
        }
        Ok(())
    }

    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn missing(&self) -> usize {
        self.missing
    }

    pub fn into_profiles(self) -> HashMap<UserId, ResolvedProfile> {
        self.resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use beyondwork_activity::UserProfile;
    use beyondwork_core::EventId;

    #[tokio::test]
    async fn only_completed_events_are_extracted() {
        let store = InMemoryDocumentStore::new();
        let mut done = SportEvent::new(EventId::new("e1"), UserId::new("h"), None, 10);
        done.status = EventStatus::Completed;
        done.company = Some("  ".to_string());
        done.participants = vec![UserId::new("u1")];
        store.put_event(done).await.unwrap();
        store
            .put_event(SportEvent::new(EventId::new("e2"), UserId::new("h"), Some("Golf".into()), 10))
            .await
            .unwrap();

        let extractor = ParticipationExtractor::new(&store, &store);
        let events = extractor.completed_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sport.as_str(), "OTHER");
        assert_eq!(events[0].company, None);
    }

    #[tokio::test]
    async fn users_are_looked_up_once_per_directory() {
        let store = InMemoryDocumentStore::new();
        store
            .put_user(UserProfile::new(UserId::new("u1"), "Ann", "Acme"))
            .await
            .unwrap();
        store
            .put_user(UserProfile::new(UserId::new("u2"), "   ", ""))
            .await
            .unwrap();

        let extractor = ParticipationExtractor::new(&store, &store);
        let mut directory = extractor.directory();
        let ids = [UserId::new("u1"), UserId::new("u1"), UserId::new("u2"), UserId::new("ghost")];
        directory.resolve_all(ids.iter()).await.unwrap();

        assert_eq!(directory.lookups(), 3);
        assert_eq!(directory.missing(), 1);

        let profiles = directory.into_profiles();
        assert_eq!(profiles[&UserId::new("u1")].company.as_deref(), Some("Acme"));
        assert_eq!(profiles[&UserId::new("u2")].display_name, UNKNOWN_DISPLAY_NAME);
        assert_eq!(profiles[&UserId::new("u2")].company, None);
        assert_eq!(profiles[&UserId::new("ghost")], ResolvedProfile::unknown());
    }
}
