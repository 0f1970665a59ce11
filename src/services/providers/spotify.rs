//! Spotify Web API provider
//!
//! Used for live artist search and for importing the connected account's top
//! artists as preferences. Access tokens come from the injected [`TokenCache`].
use std::sync::Arc;

use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Artist, SpotifyPage, SpotifySearchResponse},
    services::{providers::MusicCatalog, token_cache::TokenCache},
};

const ARTIST_SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const TOP_ARTISTS_TIME_RANGE: &str = "medium_term";

#[derive(Clone)]
pub struct SpotifyClient {
    http_client: HttpClient,
    api_url: String,
    tokens: Arc<TokenCache>,
    cache: Option<Cache>,
}

impl SpotifyClient {
    pub fn new(
        http_client: HttpClient,
        api_url: String,
        tokens: Arc<TokenCache>,
        cache: Option<Cache>,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens,
            cache,
        }
    }

    /// Authorized GET against the Web API
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let token = self.tokens.get_or_refresh().await?;
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Spotify API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    async fn fetch_search(&self, query: &str, limit: u32) -> AppResult<Vec<Artist>> {
        let response: SpotifySearchResponse = self
            .get_json(
                "/search",
                &[
                    ("q", query.to_string()),
                    ("type", "artist".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(response.artists.items.into_iter().map(Artist::from).collect())
    }
}

#[async_trait::async_trait]
impl MusicCatalog for SpotifyClient {
    async fn search_artists(&self, query: &str, limit: u32) -> Vec<Artist> {
        let result: AppResult<Vec<Artist>> = cached!(
            self.cache.as_ref(),
            CacheKey::ArtistSearch(format!("{}|{}", query, limit)),
            ARTIST_SEARCH_CACHE_TTL,
            self.fetch_search(query, limit)
        );

        match result {
            Ok(artists) => {
                tracing::info!(
                    query = %query,
                    results = artists.len(),
                    provider = "spotify",
                    "Artist search completed"
                );
                artists
            }
            Err(e) => {
                tracing::error!(query = %query, error = %e, "Error searching Spotify artists");
                Vec::new()
            }
        }
    }

    async fn top_artists(&self, limit: u32, offset: u32) -> Vec<Artist> {
        let result: AppResult<SpotifyPage> = self
            .get_json(
                "/me/top/artists",
                &[
                    ("time_range", TOP_ARTISTS_TIME_RANGE.to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await;

        match result {
            Ok(page) => page.items.into_iter().map(Artist::from).collect(),
            Err(e) => {
                tracing::error!(limit, offset, error = %e, "Error fetching top artists");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        "spotify"
    }
}
