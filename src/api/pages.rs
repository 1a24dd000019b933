//! Content page endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::{
    db::PageRepository,
    models::Page,
    utils::{AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(home_page))
        .route("/{slug}", get(page_by_slug))
}

/// Home page; a placeholder is created on first access
async fn home_page(State(state): State<AppState>) -> AppResult<Json<Page>> {
    let page = PageRepository::new(&state.db).get_or_create_home().await?;
    Ok(Json(page))
}

async fn page_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Page>> {
    let page = PageRepository::new(&state.db)
        .get_active_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::not_found("Page not found"))?;

    Ok(Json(page))
}
