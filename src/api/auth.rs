//! Authentication endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::{
    db::UserRepository,
    middleware::auth::create_access_token,
    middleware::AuthUser,
    models::{LoginRequest, LoginResponse, UserInfo},
    services::AuthService,
    utils::{AppError, AppResult},
    AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    payload.validate()?;

    let user = AuthService::new(&state.db)
        .authenticate(&payload.username, &payload.password)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid username or password"))?;

    let token = create_access_token(
        &user.id,
        &user.username,
        &user.email,
        &state.config.auth.jwt_secret,
        state.config.auth.token_expiry_hours,
    )
    .map_err(|e| {
        tracing::error!("Failed to issue token: {}", e);
        AppError::internal("Failed to issue token")
    })?;

    Ok(Json(LoginResponse {
        token,
        user: UserInfo::from(&user),
    }))
}

async fn me(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<Json<UserInfo>> {
    let user = UserRepository::new(&state.db)
        .get_by_id(auth_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserInfo::from(&user)))
}
