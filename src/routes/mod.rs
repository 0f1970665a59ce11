use std::sync::Arc;

use axum::{
    http::{HeaderName, StatusCode},
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::PreferenceStore,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{Aggregator, MusicCatalog},
};

pub mod events;
pub mod preferences;
pub mod spotify;
pub mod users;

/// Shared state handed to every handler
pub struct AppState {
    pub store: Arc<dyn PreferenceStore>,
    pub aggregator: Aggregator,
    pub music_catalog: Arc<dyn MusicCatalog>,
    /// Header the identity provider uses to forward the caller's user id
    pub auth_header: HeaderName,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Users
        .route("/user/:user_id", get(users::get_user).put(users::upsert_user))
        .route(
            "/user/:user_id/complete-onboarding",
            post(users::complete_onboarding),
        )
        // Preferences
        .route(
            "/user/:user_id/preferences",
            get(preferences::list_preferences).post(preferences::add_preference),
        )
        .route(
            "/user/:user_id/preferences/:segment",
            get(preferences::list_preferences_by_type).delete(preferences::remove_preference),
        )
        .route(
            "/user/:user_id/preferences/type/:kind",
            put(preferences::sync_preferences).delete(preferences::clear_preferences),
        )
        .route("/catalog/:kind", get(preferences::catalog))
        // Events
        .route(
            "/user/:user_id/recommended-events",
            get(events::recommended_events),
        )
        .route("/user/:user_id/calendar", get(events::calendar))
        .route("/events", get(events::browse))
        // Music catalog
        .route("/user/:user_id/spotify/import", post(spotify::import_top_artists))
        .route("/spotify/search/artists", get(spotify::search_artists))
        .route("/spotify/top-artists", get(spotify::top_artists))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
