//! Strongly-typed identifiers used across the domain.
//!
//! Document ids are opaque strings assigned by the document database (or by
//! the identity provider for users). They are ordered so that they can serve
//! as a deterministic tie-break key.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a user (identity provider subject, also the user document id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Identifier of a sport event document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

macro_rules! impl_string_id {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a raw identifier.
            ///
            /// No validation is applied; use `FromStr` for untrusted input.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty", $name)));
                }
                if trimmed.contains('/') {
                    return Err(DomainError::invalid_id(format!(
                        "{}: '/' is not allowed",
                        $name
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_string_id!(UserId, "UserId");
impl_string_id!(EventId, "EventId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_rejects_blank() {
        let id: UserId = "  u-1 ".parse().unwrap();
        assert_eq!(id.as_str(), "u-1");
        assert!(matches!("   ".parse::<UserId>(), Err(DomainError::InvalidId(_))));
        assert!("a/b".parse::<EventId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let id = EventId::new("evt-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"evt-9\"");
    }
}
