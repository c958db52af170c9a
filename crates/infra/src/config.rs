//! Environment configuration for storage and the leaderboard job.
//!
//! | variable | default |
//! |----------|---------|
//! | `DATABASE_URL` | unset: in-memory stores |
//! | `REDIS_URL` | unset: lock lives next to the stores |
//! | `LEADERBOARD_POINTS_PER_EVENT` | `10` |
//! | `LEADERBOARD_MAX_RANKING_SIZE` | `100` (`0` keeps every entry) |
//! | `LEADERBOARD_EMPTY_PARTITIONS` | `publish` (`publish` or `skip`) |
//! | `LEADERBOARD_RUN_TIMEOUT_SECS` | `300` |
//! | `LEADERBOARD_LOCK_TTL_SECS` | `900` |
//! | `LEADERBOARD_SCHEDULE_UTC` | `00:00` |
//! | `LEADERBOARD_SCHEDULE_ENABLED` | `true` |

use core::fmt::Display;
use core::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use beyondwork_leaderboard::AggregationConfig;

use crate::aggregation::RunSettings;
use crate::scheduler::DailySchedule;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageSettings {
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardSettings {
    pub aggregation: AggregationConfig,
    pub run: RunSettings,
    pub schedule: DailySchedule,
    pub schedule_enabled: bool,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            aggregation: AggregationConfig::default(),
            run: RunSettings::default(),
            schedule: DailySchedule::midnight(),
            schedule_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfraConfig {
    pub storage: StorageSettings,
    pub leaderboard: LeaderboardSettings,
}

impl InfraConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let storage = StorageSettings {
            database_url: get("DATABASE_URL"),
            redis_url: get("REDIS_URL"),
        };

        let defaults = LeaderboardSettings::default();
        let max_ranking_size: usize = parse(
            &get,
            "LEADERBOARD_MAX_RANKING_SIZE",
            defaults.aggregation.max_ranking_size.unwrap_or(0),
        )?;
        let aggregation = AggregationConfig {
            points_per_event: parse(
                &get,
                "LEADERBOARD_POINTS_PER_EVENT",
                defaults.aggregation.points_per_event,
            )?,
            max_ranking_size: (max_ranking_size > 0).then_some(max_ranking_size),
            empty_partition_policy: parse(
                &get,
                "LEADERBOARD_EMPTY_PARTITIONS",
                defaults.aggregation.empty_partition_policy,
            )?,
        };

        let run = RunSettings {
            run_timeout: Duration::from_secs(parse(
                &get,
                "LEADERBOARD_RUN_TIMEOUT_SECS",
                defaults.run.run_timeout.as_secs(),
            )?),
            lock_ttl: Duration::from_secs(parse(
                &get,
                "LEADERBOARD_LOCK_TTL_SECS",
                defaults.run.lock_ttl.as_secs(),
            )?),
        };
        if run.run_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "LEADERBOARD_RUN_TIMEOUT_SECS",
                reason: "must be positive".to_string(),
            });
        }
        if run.lock_ttl <= run.run_timeout {
            return Err(ConfigError::Invalid {
                key: "LEADERBOARD_LOCK_TTL_SECS",
                reason: "must exceed LEADERBOARD_RUN_TIMEOUT_SECS".to_string(),
            });
        }

        let leaderboard = LeaderboardSettings {
            aggregation,
            run,
            schedule: parse(&get, "LEADERBOARD_SCHEDULE_UTC", defaults.schedule)?,
            schedule_enabled: parse(&get, "LEADERBOARD_SCHEDULE_ENABLED", defaults.schedule_enabled)?,
        };

        Ok(Self {
            storage,
            leaderboard,
        })
    }
}

/// Parse `key` when set, otherwise fall back to `default`.
pub fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beyondwork_leaderboard::EmptyPartitionPolicy;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<InfraConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        InfraConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, InfraConfig::default());
        assert_eq!(cfg.leaderboard.aggregation.max_ranking_size, Some(100));
        assert!(cfg.storage.database_url.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://localhost/bw"),
            ("LEADERBOARD_POINTS_PER_EVENT", "1"),
            ("LEADERBOARD_MAX_RANKING_SIZE", "0"),
            ("LEADERBOARD_EMPTY_PARTITIONS", "skip"),
            ("LEADERBOARD_SCHEDULE_UTC", "03:15"),
            ("LEADERBOARD_SCHEDULE_ENABLED", "false"),
        ])
        .unwrap();

        assert_eq!(cfg.storage.database_url.as_deref(), Some("postgres://localhost/bw"));
        let lb = cfg.leaderboard;
        assert_eq!(lb.aggregation.points_per_event, 1);
        assert_eq!(lb.aggregation.max_ranking_size, None);
        assert_eq!(lb.aggregation.empty_partition_policy, EmptyPartitionPolicy::Skip);
        assert_eq!(lb.schedule, "03:15".parse().unwrap());
        assert!(!lb.schedule_enabled);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = config(&[("LEADERBOARD_POINTS_PER_EVENT", "ten")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LEADERBOARD_POINTS_PER_EVENT", .. }));

        let err = config(&[("LEADERBOARD_LOCK_TTL_SECS", "60")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LEADERBOARD_LOCK_TTL_SECS", .. }));
    }
}
