//! Partition identity and storage keys.
//!
//! A partition is one (scope, company?, sport) combination and maps to
//! exactly one snapshot document. Its key is
//! `{scope}_{company-slug}_{sport-slug}` (company part only for corporate
//! partitions), e.g. `global_all`, `global_table-tennis`,
//! `corporate_acme-corp_all`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use beyondwork_core::SportType;

/// Partitioning axis of a leaderboard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    Global,
    Corporate,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "GLOBAL",
            Scope::Corporate => "CORPORATE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GLOBAL" => Some(Scope::Global),
            "CORPORATE" => Some(Scope::Corporate),
            _ => None,
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Global
    }
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sport dimension of a partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SportFilter {
    All,
    Sport(SportType),
}

impl SportFilter {
    pub const ALL: &'static str = "ALL";

    pub fn label(&self) -> &str {
        match self {
            SportFilter::All => Self::ALL,
            SportFilter::Sport(sport) => sport.as_str(),
        }
    }

    pub fn from_label(label: &str) -> Self {
        if label == Self::ALL {
            SportFilter::All
        } else {
            SportFilter::Sport(SportType::new(label))
        }
    }
}

/// One (scope, company?, sport) combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Partition {
    pub scope: Scope,
    /// Always `None` for [`Scope::Global`].
    pub company: Option<String>,
    pub sport: SportFilter,
}

impl Partition {
    pub fn global(sport: SportFilter) -> Self {
        Self {
            scope: Scope::Global,
            company: None,
            sport,
        }
    }

    pub fn corporate(company: impl Into<String>, sport: SportFilter) -> Self {
        Self {
            scope: Scope::Corporate,
            company: Some(company.into()),
            sport,
        }
    }

    /// Deterministic storage key of this partition.
    pub fn key(&self) -> PartitionKey {
        let scope = self.scope.as_str().to_ascii_lowercase();
        let sport = slugify(self.sport.label());
        match (self.scope, &self.company) {
            (Scope::Corporate, Some(company)) => {
                PartitionKey(format!("{scope}_{}_{sport}", slugify(company)))
            }
            _ => PartitionKey(format!("{scope}_{sport}")),
        }
    }
}

/// Storage key of a snapshot document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slug used inside partition keys.
///
/// Lower-cases, keeps Unicode alphanumerics, and collapses every run of other
/// characters into one `-` (trimmed at both ends). A name with no
/// alphanumerics at all becomes `unnamed`.
///
/// Distinct names can share a slug (`"Acme Corp"`, `"ACME-corp"`,
/// `"acme  corp!"`); see [`dedupe_keys`].
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("unnamed");
    }
    slug
}

/// Two partitions that map to the same storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCollision {
    pub key: PartitionKey,
    /// Partition that keeps the key.
    pub kept: String,
    /// Partition that was dropped.
    pub dropped: String,
}

fn describe(partition: &Partition) -> String {
    match &partition.company {
        Some(company) => format!(
            "{} / {} / {}",
            partition.scope,
            company,
            partition.sport.label()
        ),
        None => format!("{} / {}", partition.scope, partition.sport.label()),
    }
}

/// Keep one item per storage key.
///
/// Items are visited in `Partition` order, so the survivor of a collision is
/// deterministic (the smallest partition). Every dropped item is reported.
pub fn dedupe_keys<T>(
    items: Vec<T>,
    partition_of: impl Fn(&T) -> &Partition,
) -> (Vec<T>, Vec<KeyCollision>) {
    let mut sorted = items;
    sorted.sort_by(|a, b| partition_of(a).cmp(partition_of(b)));

    let mut by_key: BTreeMap<PartitionKey, usize> = BTreeMap::new();
    let mut kept: Vec<T> = Vec::with_capacity(sorted.len());
    let mut collisions = Vec::new();

    for item in sorted {
        let key = partition_of(&item).key();
        match by_key.get(&key) {
            Some(&idx) => {
                let survivor = kept.get(idx).map(|k| describe(partition_of(k)));
                collisions.push(KeyCollision {
                    key,
                    kept: survivor.unwrap_or_default(),
                    dropped: describe(partition_of(&item)),
                });
            }
            None => {
                by_key.insert(key, kept.len());
                kept.push(item);
            }
        }
    }

    (kept, collisions)
}
