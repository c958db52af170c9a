use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    response::{IntoResponse, Response},
    routing::post,
};

use beyondwork_auth::CallerIdentity;
use beyondwork_core::EventId;

use crate::app::{
    dto::{EventResponse, StatusRequest},
    errors,
    services::AppServices,
};

pub fn router() -> Router {
    Router::new()
        .route("/:id/join", post(join))
        .route("/:id/status", post(change_status))
}

fn parse_event_id(raw: &str) -> Result<EventId, Response> {
    raw.parse::<EventId>().map_err(errors::domain_error_to_response)
}

pub async fn join(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<String>,
) -> Response {
    let event_id = match parse_event_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.lifecycle.join(&event_id, &caller.user_id).await {
        Ok(event) => Json(EventResponse {
            success: true,
            event,
            credited: None,
        })
        .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Response {
    let event_id = match parse_event_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let to = match req.parse() {
        Ok(status) => status,
        Err(resp) => return resp,
    };

    match services.lifecycle.change_status(&event_id, &caller, to).await {
        Ok(update) => Json(EventResponse {
            success: true,
            event: update.event,
            credited: Some(update.credited),
        })
        .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
