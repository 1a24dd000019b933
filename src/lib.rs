//! Celprep WebUI Library
//!
//! Backend for the Celprep CELPIP practice studio: api2d key lifecycle
//! management, gated practice pages and site-wide content delivery.

use std::sync::Arc;

use axum::Router;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::{auth_middleware, AuthUser, Claims};
use services::api2d::KeyAuthority;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// api2d key service client (optional)
    pub api2d: Option<Arc<dyn KeyAuthority>>,
}

/// Build the API router: public routes plus protected routes behind the
/// auth middleware, all under `/api/v1`
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api::public_routes())
        .nest(
            "/api/v1",
            api::protected_routes().layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::auth::auth_middleware,
            )),
        )
        .with_state(state)
}
