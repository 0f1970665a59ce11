use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{User, UserProfile},
};

use super::AppState;

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    auth.ensure_owns(&user_id)?;

    let user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Creates or updates the user on sign-in
pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    payload: Result<Json<UserProfile>, JsonRejection>,
) -> AppResult<Json<User>> {
    auth.ensure_owns(&user_id)?;
    let Json(profile) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let user = state.store.upsert_user(&user_id, profile).await?;
    tracing::info!(user_id = %user.id, "User upserted");

    Ok(Json(user))
}

pub async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    auth.ensure_owns(&user_id)?;

    let user = state
        .store
        .complete_onboarding(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Onboarding completed");
    Ok(Json(user))
}
