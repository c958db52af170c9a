use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use beyondwork_auth::CallerIdentity;
use beyondwork_infra::aggregation::Trigger;

use crate::app::{
    dto::{CalculateResponse, LeaderboardParams, LeaderboardsResponse},
    errors,
    services::AppServices,
};

/// Read published snapshots. Never triggers a calculation.
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<LeaderboardParams>,
) -> Response {
    let query = match params.into_query() {
        Ok(query) => query,
        Err(resp) => return resp,
    };

    match services.snapshots.query_snapshots(&query).await {
        Ok(leaderboards) => Json(LeaderboardsResponse {
            success: true,
            leaderboards,
        })
        .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Run aggregation now on behalf of the caller.
pub async fn calculate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Response {
    if !caller.has_at_least(services.trigger_min_role) {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "permission_denied",
            format!("requires role {} or above", services.trigger_min_role.as_str()),
        );
    }

    let trigger = Trigger::Manual {
        caller: caller.user_id,
    };
    match services.aggregator.run(trigger).await {
        Ok(report) => Json(CalculateResponse {
            success: true,
            message: "Leaderboards calculated successfully",
            report,
        })
        .into_response(),
        Err(e) => errors::run_error_to_response(e),
    }
}
