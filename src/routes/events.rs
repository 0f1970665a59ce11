use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{CanonicalEvent, Category, PreferenceSet},
    services::calendar::{self, CalendarView, ViewMode},
};

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseQuery {
    pub category: Option<String>,
    pub keyword: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub view: Option<String>,
    pub date: Option<NaiveDate>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn recommended_for(
    state: &AppState,
    user_id: &str,
    today: NaiveDate,
) -> AppResult<Vec<CanonicalEvent>> {
    // Re-read on every request so new preferences apply immediately
    let preferences = state.store.list_preferences(user_id, None).await?;
    let set = PreferenceSet::from_preferences(&preferences);
    Ok(state.aggregator.recommended_events(&set, today).await)
}

/// Events matching the user's saved preferences
pub async fn recommended_events(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<CanonicalEvent>>> {
    auth.ensure_owns(&user_id)?;
    let events = recommended_for(&state, &user_id, today()).await?;
    Ok(Json(events))
}

/// Recommended events laid out for a day, week or month
pub async fn calendar(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> AppResult<Json<CalendarView>> {
    auth.ensure_owns(&user_id)?;
    let Query(query) = query.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let mode = match query.view.as_deref() {
        Some(view) => view.parse::<ViewMode>().map_err(AppError::InvalidInput)?,
        None => ViewMode::default(),
    };
    let today = today();
    let anchor = query.date.unwrap_or(today);

    let events = recommended_for(&state, &user_id, today).await?;
    Ok(Json(calendar::render(&events, mode, anchor, today)))
}

/// Public event search
pub async fn browse(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BrowseQuery>,
) -> AppResult<Json<Vec<CanonicalEvent>>> {
    let category = query
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(str::parse::<Category>)
        .transpose()
        .map_err(AppError::InvalidInput)?;

    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if end < start {
            return Err(AppError::InvalidInput(
                "endDate must not be before startDate".to_string(),
            ));
        }
    }

    let keyword = query.keyword.filter(|k| !k.trim().is_empty());
    let events = state
        .aggregator
        .browse(category, keyword, query.start_date, query.end_date)
        .await;

    Ok(Json(events))
}
