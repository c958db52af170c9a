use axum::{
    Router,
    routing::{get, post},
};

pub mod events;
pub mod leaderboards;
pub mod system;

/// Endpoints that need no caller identity.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/leaderboards", get(leaderboards::list))
}

/// Endpoints behind bearer-token authentication.
pub fn protected_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/leaderboards/calculate", post(leaderboards::calculate))
        .nest("/events", events::router())
}
