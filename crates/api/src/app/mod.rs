//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, lock and aggregator wiring
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use beyondwork_auth::{Hs256TokenVerifier, TokenVerifier};

use crate::{config::ApiConfig, middleware};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{AppServices, StartupError};

/// Router over already-built services. Tests use this with in-memory backends.
pub fn build_router(services: Arc<AppServices>, verifier: Arc<dyn TokenVerifier>) -> Router {
    let auth_state = middleware::AuthState { verifier };

    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!("http_request", method = %req.method(), uri = %req.uri())
                }))
                .layer(Extension(services)),
        )
}

/// Connect backends and build the router (entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> Result<(Router, Arc<AppServices>), StartupError> {
    let services = Arc::new(AppServices::connect(config).await?);
    let verifier: Arc<dyn TokenVerifier> = Arc::new(Hs256TokenVerifier::new(config.jwt_secret.as_bytes()));
    Ok((build_router(services.clone(), verifier), services))
}
