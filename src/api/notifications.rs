//! Banner notification endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

use crate::{db::NotificationRepository, models::Notification, utils::AppResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(active_notifications))
}

/// Currently visible banners, newest start first
async fn active_notifications(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = NotificationRepository::new(&state.db)
        .active_at(Utc::now())
        .await?;

    Ok(Json(notifications))
}
