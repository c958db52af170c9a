use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use beyondwork_auth::CallerIdentity;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(caller): Extension<CallerIdentity>) -> impl IntoResponse {
    Json(serde_json::json!({
        "userId": caller.user_id.as_str(),
        "role": caller.role.as_str(),
    }))
}
