//! Key management endpoints
//!
//! One key per account: viewing the page provisions a key when none exists,
//! POST binds a key the user already possesses, DELETE removes the local
//! record.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use crate::{
    middleware::AuthUser,
    models::{ApiKeyView, BindApiKeyRequest},
    services::KeyLifecycleService,
    utils::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(get_api_key).post(bind_api_key).delete(delete_api_key),
    )
}

#[derive(Debug, Serialize)]
struct ApiKeyPageResponse {
    api_key: ApiKeyView,
    /// Forward endpoint the key is used against
    openai_endpoint: String,
}

async fn get_api_key(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiKeyPageResponse>> {
    let record = KeyLifecycleService::new(&state.db, state.api2d.as_deref())
        .get_or_provision(auth_user.id)
        .await?;

    Ok(Json(ApiKeyPageResponse {
        api_key: ApiKeyView::from_record(&record, Utc::now()),
        openai_endpoint: state.config.openai_endpoint(),
    }))
}

async fn bind_api_key(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<BindApiKeyRequest>,
) -> AppResult<(StatusCode, Json<ApiKeyView>)> {
    payload.validate()?;

    let record = KeyLifecycleService::new(&state.db, state.api2d.as_deref())
        .bind_submitted_key(auth_user.id, &payload.key)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyView::from_record(&record, Utc::now())),
    ))
}

async fn delete_api_key(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<serde_json::Value>> {
    KeyLifecycleService::new(&state.db, state.api2d.as_deref())
        .delete_key(auth_user.id)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Your API key has been deleted successfully."
    })))
}
