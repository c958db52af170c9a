//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (identifiers,
/// lifecycle rules, membership conflicts). Storage and transport failures
/// belong to the infra and api crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. empty).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A lifecycle transition is not allowed from the current state.
    #[error("cannot move event from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The event no longer accepts changes to its roster.
    #[error("event is {0} and no longer accepts participants")]
    Closed(String),

    /// The roster already holds `capacity` participants.
    #[error("event is full (capacity {capacity})")]
    CapacityReached { capacity: u32 },

    /// A conflict occurred (e.g. joining an event twice).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The actor may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}
