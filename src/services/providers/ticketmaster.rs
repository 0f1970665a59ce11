//! Ticketmaster Discovery API provider
//!
//! One request per query, scoped to a single DMA and sorted by date. Raw
//! records are normalized into [`CanonicalEvent`]s; records without a usable
//! local date are dropped.
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client as HttpClient;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{CanonicalEvent, TicketmasterResponse},
    services::providers::{EventSource, SearchParams},
};

const UPSTREAM_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Connection settings for the Discovery API
#[derive(Debug, Clone)]
pub struct TicketmasterSettings {
    pub api_key: String,
    pub api_url: String,
    pub dma_id: String,
    pub timeout: Duration,
    pub requests_per_second: u32,
    pub cache_ttl: u64,
}

#[derive(Clone)]
pub struct TicketmasterClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    dma_id: String,
    cache: Option<Cache>,
    cache_ttl: u64,
    /// Token bucket shared by every clone of this client
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl TicketmasterClient {
    pub fn new(settings: TicketmasterSettings, cache: Option<Cache>) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(settings.timeout).build()?;

        let per_second = NonZeroU32::new(settings.requests_per_second).ok_or_else(|| {
            AppError::InvalidInput("Upstream request rate must be at least 1/s".to_string())
        })?;

        Ok(Self {
            http_client,
            api_key: settings.api_key,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            dma_id: settings.dma_id,
            cache,
            cache_ttl: settings.cache_ttl,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        })
    }

    /// Query-string pairs for a search, excluding the API key
    fn query_pairs(&self, params: &SearchParams) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("dmaId", self.dma_id.clone()),
            ("size", params.size.to_string()),
            ("sort", "date,asc".to_string()),
        ];

        if let Some(start) = params.start {
            pairs.push(("startDateTime", start.format(UPSTREAM_DATE_FORMAT).to_string()));
        }
        if let Some(end) = params.end {
            pairs.push(("endDateTime", end.format(UPSTREAM_DATE_FORMAT).to_string()));
        }
        if let Some(keyword) = &params.keyword {
            pairs.push(("keyword", keyword.clone()));
        }
        if let Some(classification) = &params.classification_name {
            pairs.push(("classificationName", classification.clone()));
        }

        pairs
    }

    fn cache_key(pairs: &[(&'static str, String)]) -> CacheKey {
        let query = pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&");
        CacheKey::EventSearch(query)
    }

    /// Performs the HTTP request and normalizes the response
    async fn fetch(
        &self,
        label: &str,
        pairs: &[(&'static str, String)],
    ) -> AppResult<Vec<CanonicalEvent>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/events.json", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(pairs)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Ticketmaster API returned status {}: {}",
                status, body
            )));
        }

        let raw_events = response.json::<TicketmasterResponse>().await?.into_events();

        if raw_events.is_empty() {
            tracing::info!(query = %label, "No events found for query");
            return Ok(Vec::new());
        }

        let received = raw_events.len();
        let events: Vec<CanonicalEvent> = raw_events
            .into_iter()
            .filter_map(|raw| match CanonicalEvent::try_from(raw) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::debug!(error = %e, "Dropping upstream event");
                    None
                }
            })
            .collect();

        tracing::info!(
            query = %label,
            received,
            normalized = events.len(),
            provider = "ticketmaster",
            "Event search completed"
        );

        Ok(events)
    }
}

#[async_trait::async_trait]
impl EventSource for TicketmasterClient {
    async fn search(&self, params: SearchParams) -> Vec<CanonicalEvent> {
        let pairs = self.query_pairs(&params);
        let label = params.label();

        let result: AppResult<Vec<CanonicalEvent>> = cached!(
            self.cache.as_ref(),
            Self::cache_key(&pairs),
            self.cache_ttl,
            self.fetch(label, &pairs)
        );

        // No results and upstream errors look the same to callers
        result.unwrap_or_else(|e| {
            tracing::error!(query = %label, error = %e, "Ticketmaster search failed");
            Vec::new()
        })
    }

    fn name(&self) -> &'static str {
        "ticketmaster"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn settings(api_url: String, timeout: Duration) -> TicketmasterSettings {
        TicketmasterSettings {
            api_key: "test_key".to_string(),
            api_url,
            dma_id: "249".to_string(),
            timeout,
            requests_per_second: 50,
            cache_ttl: 60,
        }
    }

    /// Serves `router` on an ephemeral local port and returns its base URL
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> TicketmasterClient {
        TicketmasterClient::new(settings(base_url, Duration::from_secs(2)), None).unwrap()
    }

    #[test]
    fn test_query_pairs_include_market_and_sort() {
        let client = client_for("http://test.local/".to_string());
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();

        let params = SearchParams::classification("Sports")
            .with_keyword("Chicago Bears")
            .with_range(Some(start), None);
        let pairs = client.query_pairs(&params);

        assert_eq!(
            pairs,
            vec![
                ("dmaId", "249".to_string()),
                ("size", "50".to_string()),
                ("sort", "date,asc".to_string()),
                ("startDateTime", "2025-01-10T00:00:00Z".to_string()),
                ("keyword", "Chicago Bears".to_string()),
                ("classificationName", "Sports".to_string()),
            ]
        );
        assert_eq!(client.api_url, "http://test.local");
    }

    #[test]
    fn test_cache_key_excludes_api_key() {
        let client = client_for("http://test.local".to_string());
        let pairs = client.query_pairs(&SearchParams::classification("Music"));
        let key = TicketmasterClient::cache_key(&pairs).to_string();

        assert_eq!(
            key,
            "events:dmaid=249&size=50&sort=date,asc&classificationname=music"
        );
        assert!(!key.contains("test_key"));
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        let mut bad = settings("http://test.local".to_string(), Duration::from_secs(1));
        bad.requests_per_second = 0;
        assert!(TicketmasterClient::new(bad, None).is_err());
    }

    #[tokio::test]
    async fn test_search_normalizes_events() {
        let router = Router::new().route(
            "/events.json",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query.get("apikey").map(String::as_str), Some("test_key"));
                assert_eq!(query.get("dmaId").map(String::as_str), Some("249"));
                assert_eq!(query.get("keyword").map(String::as_str), Some("Wilco"));
                Json(json!({
                    "_embedded": {
                        "events": [
                            {
                                "id": "e1",
                                "name": "Wilco",
                                "url": "https://tm/e1",
                                "images": [{ "url": "https://img/e1.jpg", "width": 640 }],
                                "dates": { "start": { "localDate": "2025-03-07", "localTime": "20:00:00" } },
                                "classifications": [{ "segment": { "name": "Music" } }],
                                "_embedded": { "venues": [{ "name": "The Riviera Theatre" }] }
                            },
                            {
                                "id": "e2",
                                "name": "Undated",
                                "dates": { "start": {} }
                            }
                        ]
                    }
                }))
            }),
        );
        let client = client_for(serve(router).await);

        let events = client
            .search(SearchParams::classification("Music").with_keyword("Wilco"))
            .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "e1");
        assert_eq!(events[0].date, "Mar 7, 2025 · 8:00 PM");
        assert_eq!(events[0].venue, "The Riviera Theatre");
    }

    #[tokio::test]
    async fn test_search_without_embedded_events_is_empty() {
        let router = Router::new().route(
            "/events.json",
            get(|| async { Json(json!({ "page": { "totalElements": 0 } })) }),
        );
        let client = client_for(serve(router).await);

        assert!(client.search(SearchParams::classification("Sports")).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_soft_fails_on_error_status() {
        let router = Router::new().route(
            "/events.json",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        );
        let client = client_for(serve(router).await);

        assert!(client.search(SearchParams::classification("Sports")).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_soft_fails_on_malformed_body() {
        let router = Router::new().route("/events.json", get(|| async { "not json" }));
        let client = client_for(serve(router).await);

        assert!(client.search(SearchParams::classification("Music")).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_soft_fails_on_timeout() {
        let router = Router::new().route(
            "/events.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(Value::Null)
            }),
        );
        let base_url = serve(router).await;
        let client =
            TicketmasterClient::new(settings(base_url, Duration::from_millis(200)), None).unwrap();

        assert!(client.search(SearchParams::classification("Music")).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_soft_fails_when_unreachable() {
        // Port 9 (discard) is not served locally
        let client = client_for("http://127.0.0.1:9".to_string());
        assert!(client.search(SearchParams::classification("Music")).await.is_empty());
    }
}
