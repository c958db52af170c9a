//! Sport type tags.

use serde::{Deserialize, Serialize};

/// Free-form sport tag carried by events (e.g. `"Cricket"`).
///
/// Events without a usable tag are bucketed under [`SportType::OTHER`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SportType(String);

impl SportType {
    /// Bucket for events with a missing or blank sport tag.
    pub const OTHER: &'static str = "OTHER";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn other() -> Self {
        Self(Self::OTHER.to_string())
    }

    /// Normalise an optional raw tag: blank or missing becomes `OTHER`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(tag) if !tag.is_empty() => Self(tag.to_string()),
            _ => Self::other(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SportType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_tags_fall_into_other() {
        assert_eq!(SportType::from_raw(None).as_str(), "OTHER");
        assert_eq!(SportType::from_raw(Some("  ")).as_str(), "OTHER");
        assert_eq!(SportType::from_raw(Some(" Cricket ")).as_str(), "Cricket");
    }
}
