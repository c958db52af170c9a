//! `beyondwork-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod document;
pub mod error;
pub mod id;
pub mod sport;

pub use document::Document;
pub use error::{DomainError, DomainResult};
pub use id::{EventId, UserId};
pub use sport::SportType;
