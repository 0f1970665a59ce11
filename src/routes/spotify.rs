use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::Artist,
    services::preferences::{self as preference_service, ImportOutcome, DEFAULT_IMPORT_LIMIT},
};

use super::AppState;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const DEFAULT_TOP_ARTISTS_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct ArtistSearchQuery {
    #[serde(default)]
    pub query: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

pub async fn search_artists(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(params): Query<ArtistSearchQuery>,
) -> AppResult<Json<Vec<Artist>>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("Search query is required".to_string()));
    }

    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    Ok(Json(state.music_catalog.search_artists(query, limit).await))
}

/// Top artists of the connected account, read page by page up to `limit`
pub async fn top_artists(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Vec<Artist>>> {
    let limit = params.limit.unwrap_or(DEFAULT_TOP_ARTISTS_LIMIT);
    Ok(Json(state.music_catalog.top_artists_paged(limit).await))
}

pub async fn import_top_artists(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<ImportOutcome>> {
    auth.ensure_owns(&user_id)?;

    let outcome = preference_service::import_top_artists(
        state.store.as_ref(),
        state.music_catalog.as_ref(),
        &user_id,
        params.limit.unwrap_or(DEFAULT_IMPORT_LIMIT),
    )
    .await?;

    Ok(Json(outcome))
}
