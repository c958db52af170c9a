use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use beyondwork_core::DomainError;
use beyondwork_infra::aggregation::RunError;
use beyondwork_infra::store::StoreError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound { collection, id } => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{collection}/{id} not found"))
        }
        StoreError::Rejected(e) => domain_error_to_response(e),
        StoreError::Corrupt { .. } | StoreError::Storage(_) => {
            tracing::error!(error = %err, "store failure");
            internal("internal error")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvalidTransition { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition", message)
        }
        DomainError::Closed(_) => json_error(StatusCode::CONFLICT, "event_closed", message),
        DomainError::CapacityReached { .. } => json_error(StatusCode::CONFLICT, "event_full", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "permission_denied", message),
    }
}

/// Failures are already logged by the runner; callers only learn the category.
pub fn run_error_to_response(err: RunError) -> axum::response::Response {
    match err {
        RunError::AlreadyRunning => json_error(
            StatusCode::CONFLICT,
            "already_running",
            "a leaderboard calculation is already in progress",
        ),
        _ => internal("Failed to calculate leaderboards"),
    }
}

pub fn internal(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
