//! Gated feature pages
//!
//! Both practice pages hand the browser the caller's key plus the model and
//! prompt configuration it needs to talk to the forward endpoints directly.
//! Access is denied without a current key record.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{
    middleware::AuthUser,
    services::FeatureGate,
    utils::AppResult,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/speaking", get(speaking))
        .route("/writing", get(writing))
}

/// Context for the speaking practice page
#[derive(Debug, Serialize)]
struct SpeakingContext {
    api_key: String,
    endpoint: String,
    stt_model: String,
    text_model: String,
}

/// Context for the writing practice page
#[derive(Debug, Serialize)]
struct WritingContext {
    api_key: String,
    endpoint: String,
    model: String,
    system_prompt: String,
}

async fn speaking(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<SpeakingContext>> {
    let record = FeatureGate::new(&state.db).authorize(auth_user.id).await?;

    Ok(Json(SpeakingContext {
        api_key: record.key,
        endpoint: state.config.claude_endpoint(),
        stt_model: state.config.features.speaking.stt_model.clone(),
        text_model: state.config.features.speaking.text_model.clone(),
    }))
}

async fn writing(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<WritingContext>> {
    let record = FeatureGate::new(&state.db).authorize(auth_user.id).await?;

    Ok(Json(WritingContext {
        api_key: record.key,
        endpoint: state.config.claude_endpoint(),
        model: state.config.features.writing.model.clone(),
        system_prompt: state.config.features.writing.system_prompt.clone(),
    }))
}
