use serde::{Deserialize, Serialize};

use beyondwork_activity::{EventStatus, SportEvent};
use beyondwork_infra::aggregation::RunReport;
use beyondwork_leaderboard::{LeaderboardQuery, LeaderboardSnapshot, Scope};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// `GET /leaderboards` query string. `scope` is accepted for `type`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardParams {
    #[serde(rename = "type", alias = "scope")]
    pub scope: Option<String>,
    pub sport_type: Option<String>,
    pub company: Option<String>,
}

impl LeaderboardParams {
    pub fn into_query(self) -> Result<LeaderboardQuery, axum::response::Response> {
        let scope = match self.scope.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Scope::default(),
            Some(raw) => Scope::parse(raw).ok_or_else(|| {
                errors::json_error(
                    axum::http::StatusCode::BAD_REQUEST,
                    "invalid_scope",
                    "type must be one of: GLOBAL, CORPORATE",
                )
            })?,
        };

        let mut query = LeaderboardQuery::new(scope);
        if let Some(sport) = self.sport_type {
            query = query.with_sport(sport);
        }
        if let Some(company) = self.company {
            query = query.with_company(company);
        }
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    pub fn parse(&self) -> Result<EventStatus, axum::response::Response> {
        EventStatus::parse(&self.status).ok_or_else(|| {
            errors::json_error(
                axum::http::StatusCode::BAD_REQUEST,
                "invalid_status",
                "status must be one of: UPCOMING, ONGOING, COMPLETED, CANCELLED",
            )
        })
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LeaderboardsResponse {
    pub success: bool,
    pub leaderboards: Vec<LeaderboardSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub success: bool,
    pub message: &'static str,
    pub report: RunReport,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub success: bool,
    pub event: SportEvent,
    /// Present on status changes; participants credited on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credited: Option<usize>,
}
