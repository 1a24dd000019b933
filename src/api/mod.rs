//! API routes and handlers

use axum::{routing::get, Router};

use crate::AppState;

mod api_keys;
mod auth;
mod features;
mod health;
mod notifications;
mod pages;

/// Public API routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth::public_routes())
        .nest("/pages", pages::routes())
        .nest("/notifications", notifications::routes())
}

/// Protected API routes (authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::protected_routes())
        .nest("/api-key", api_keys::routes())
        .nest("/features", features::routes())
}
