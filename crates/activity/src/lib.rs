//! `beyondwork-activity`: sport events and user profiles as stored documents.
//!
//! Holds the participation rules (joining, lifecycle transitions) and the
//! stats credited to users when an event completes. Pure domain: no IO.

pub mod event;
pub mod profile;

pub use event::{EventStatus, SportEvent, StatusChange};
pub use profile::{StatsCredit, UserProfile, UserStats};
