//! Event roster and status changes, with completion credits.

use std::sync::Arc;

use tracing::{info, warn};

use beyondwork_activity::{EventStatus, SportEvent, StatusChange};
use beyondwork_auth::{CallerIdentity, Role};
use beyondwork_core::{DomainError, EventId, UserId};

use crate::store::{EventStore, StoreResult, UserStore, mutation};

/// Result of a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub event: SportEvent,
    pub change: StatusChange,
    /// Users whose stats were credited (completion only).
    pub credited: usize,
}

pub struct EventLifecycle {
    events: Arc<dyn EventStore>,
    users: Arc<dyn UserStore>,
}

impl EventLifecycle {
    pub fn new(events: Arc<dyn EventStore>, users: Arc<dyn UserStore>) -> Self {
        Self { events, users }
    }

    /// Add `user` to the event's roster.
    pub async fn join(&self, event_id: &EventId, user: &UserId) -> StoreResult<SportEvent> {
        let joiner = user.clone();
        let update = self
            .events
            .update_event(event_id, mutation(move |event| event.join(joiner)))
            .await?;
        info!(event_id = %event_id, user_id = %user, "joined event");
        Ok(update.after)
    }

    /// Move the event to `to`. Only the creator or a corporate admin may do
    /// this. Reaching COMPLETED credits every participant and the creator.
    pub async fn change_status(
        &self,
        event_id: &EventId,
        caller: &CallerIdentity,
        to: EventStatus,
    ) -> StoreResult<StatusUpdate> {
        let actor = caller.clone();
        let update = self
            .events
            .update_event(
                event_id,
                mutation(move |event| {
                    if event.created_by != actor.user_id && !actor.has_at_least(Role::CorporateAdmin) {
                        return Err(DomainError::forbidden(
                            "only the creator or an admin can change event status",
                        ));
                    }
                    event.transition(to).map(|_| ())
                }),
            )
            .await?;

        let change = StatusChange {
            from: update.before.status,
            to: update.after.status,
        };
        info!(event_id = %event_id, from = %change.from, to = %change.to, "event status changed");

        let mut credited = 0;
        if change.completed() {
            for (user_id, credit) in update.after.completion_credits() {
                if self.users.credit_user(&user_id, credit).await? {
                    credited += 1;
                } else {
                    warn!(event_id = %event_id, user_id = %user_id, "no profile to credit");
                }
            }
        }

        Ok(StatusUpdate {
            event: update.after,
            change,
            credited,
        })
    }
}
