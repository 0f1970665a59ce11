use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{NewPreference, Preference, PreferenceItem, PreferenceKind},
    services::{
        preference_selector,
        preferences::{self as preference_service, SyncOutcome},
    },
};

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPreferenceRequest {
    #[serde(rename = "type")]
    pub kind: PreferenceKind,
    pub item_id: String,
    pub item_name: String,
    #[serde(default)]
    pub item_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SyncPreferencesRequest {
    pub items: Vec<PreferenceItem>,
}

fn parse_kind(value: &str) -> AppResult<PreferenceKind> {
    value.parse().map_err(AppError::InvalidInput)
}

pub async fn list_preferences(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Preference>>> {
    auth.ensure_owns(&user_id)?;
    let preferences = state.store.list_preferences(&user_id, None).await?;
    Ok(Json(preferences))
}

/// `GET .../preferences/:type`
pub async fn list_preferences_by_type(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((user_id, kind)): Path<(String, String)>,
) -> AppResult<Json<Vec<Preference>>> {
    auth.ensure_owns(&user_id)?;
    let kind = parse_kind(&kind)?;
    let preferences = state.store.list_preferences(&user_id, Some(kind)).await?;
    Ok(Json(preferences))
}

pub async fn add_preference(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    payload: Result<Json<AddPreferenceRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Preference>)> {
    auth.ensure_owns(&user_id)?;
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let preference = preference_service::add_preference(
        state.store.as_ref(),
        NewPreference {
            user_id,
            kind: request.kind,
            item_id: request.item_id,
            item_name: request.item_name,
            item_image: request.item_image,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(preference)))
}

/// `DELETE .../preferences/:itemId`
pub async fn remove_preference(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((user_id, item_id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    auth.ensure_owns(&user_id)?;
    let removed = state.store.remove_preference(&user_id, &item_id).await?;
    tracing::info!(user_id = %user_id, item_id = %item_id, removed, "Preference removed");
    Ok(Json(json!({ "success": true })))
}

/// Replaces the stored preferences of one type with the submitted selection
pub async fn sync_preferences(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((user_id, kind)): Path<(String, String)>,
    payload: Result<Json<SyncPreferencesRequest>, JsonRejection>,
) -> AppResult<Json<SyncOutcome>> {
    auth.ensure_owns(&user_id)?;
    let kind = parse_kind(&kind)?;
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let outcome =
        preference_service::sync_selection(state.store.as_ref(), &user_id, kind, request.items)
            .await?;
    Ok(Json(outcome))
}

pub async fn clear_preferences(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((user_id, kind)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    auth.ensure_owns(&user_id)?;
    let kind = parse_kind(&kind)?;
    let removed = state.store.clear_preferences(&user_id, kind).await?;
    tracing::info!(user_id = %user_id, kind = %kind, removed, "Preferences cleared");
    Ok(Json(json!({ "success": true })))
}

/// Built-in options for a preference type
pub async fn catalog(Path(kind): Path<String>) -> AppResult<Json<Vec<PreferenceItem>>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(preference_selector::catalog(kind)))
}
