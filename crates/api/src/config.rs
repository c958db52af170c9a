//! Server configuration from the environment.
//!
//! Adds `BIND_ADDR`, `JWT_SECRET`, `LOG_FORMAT` and `MANUAL_TRIGGER_MIN_ROLE`
//! to the storage/leaderboard variables read by [`InfraConfig`].

use std::net::SocketAddr;

use beyondwork_auth::Role;
use beyondwork_infra::config::{ConfigError, InfraConfig, parse};
use beyondwork_observability::LogFormat;

pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// True when `JWT_SECRET` was unset and the dev default is in use.
    pub jwt_secret_defaulted: bool,
    pub log_format: LogFormat,
    pub manual_trigger_min_role: Role,
    pub infra: InfraConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET");
        let manual_trigger_min_role = match get("MANUAL_TRIGGER_MIN_ROLE") {
            Some(raw) => strict_role(&raw)?,
            None => Role::User,
        };

        Ok(Self {
            bind_addr: parse(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            jwt_secret_defaulted: jwt_secret.is_none(),
            jwt_secret: jwt_secret.unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            log_format: parse(&get, "LOG_FORMAT", LogFormat::Json)?,
            manual_trigger_min_role,
            infra: InfraConfig::from_lookup(&get)?,
        })
    }
}

/// Unlike token claims, configuration must name a real role.
fn strict_role(raw: &str) -> Result<Role, ConfigError> {
    let role = Role::parse(raw);
    if role.as_str().eq_ignore_ascii_case(raw.trim()) {
        Ok(role)
    } else {
        Err(ConfigError::Invalid {
            key: "MANUAL_TRIGGER_MIN_ROLE",
            reason: format!("unknown role '{raw}' (expected USER|CORPORATE_ADMIN|SUPER_ADMIN)"),
        })
    }
}
