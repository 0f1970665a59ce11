use std::time::{Duration, Instant};

use reqwest::Client as HttpClient;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::SpotifyTokenResponse,
};

/// Tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// OAuth client credentials plus the long-lived refresh token of the connected account
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Access-token cache for the music catalog
///
/// Holds at most one token. The mutex is held across a refresh so that
/// concurrent callers wait for a single refresh instead of racing.
pub struct TokenCache {
    http_client: HttpClient,
    token_url: String,
    credentials: Option<OAuthCredentials>,
    current: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(
        http_client: HttpClient,
        token_url: String,
        credentials: Option<OAuthCredentials>,
    ) -> Self {
        Self {
            http_client,
            token_url,
            credentials,
            current: Mutex::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Returns a valid access token, refreshing it when missing or about to expire
    pub async fn get_or_refresh(&self) -> AppResult<String> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.refresh().await?;
        let access_token = fresh.access_token.clone();
        *current = Some(fresh);

        Ok(access_token)
    }

    /// Drops the cached token, e.g. after the upstream rejected it
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }

    async fn refresh(&self) -> AppResult<CachedToken> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| AppError::ExternalApi("Spotify not connected".to_string()))?;

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Token refresh returned status {}: {}",
                status, body
            )));
        }

        let token: SpotifyTokenResponse = response.json().await?;
        tracing::info!(expires_in = token.expires_in, "Refreshed Spotify access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "refresh".to_string(),
        }
    }

    /// Token endpoint that counts refreshes and issues tokens lasting `expires_in`
    async fn serve_token_endpoint(expires_in: u64) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/token",
                post(
                    move |State(calls): State<Arc<AtomicUsize>>| async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                        Json(json!({
                            "access_token": format!("token-{}", n),
                            "token_type": "Bearer",
                            "expires_in": expires_in
                        }))
                    },
                ),
            )
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        (format!("http://{}/api/token", addr), calls)
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let (url, calls) = serve_token_endpoint(3600).await;
        let cache = TokenCache::new(HttpClient::new(), url, Some(credentials()));

        assert_eq!(cache.get_or_refresh().await.unwrap(), "token-1");
        assert_eq!(cache.get_or_refresh().await.unwrap(), "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nearly_expired_token_is_refreshed() {
        let (url, calls) = serve_token_endpoint(30).await;
        let cache = TokenCache::new(HttpClient::new(), url, Some(credentials()));

        assert_eq!(cache.get_or_refresh().await.unwrap(), "token-1");
        assert_eq!(cache.get_or_refresh().await.unwrap(), "token-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let (url, calls) = serve_token_endpoint(3600).await;
        let cache = TokenCache::new(HttpClient::new(), url, Some(credentials()));

        cache.get_or_refresh().await.unwrap();
        cache.invalidate().await;
        assert_eq!(cache.get_or_refresh().await.unwrap(), "token-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let (url, calls) = serve_token_endpoint(3600).await;
        let cache = Arc::new(TokenCache::new(HttpClient::new(), url, Some(credentials())));

        let (a, b) = tokio::join!(cache.get_or_refresh(), cache.get_or_refresh());
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_is_not_connected() {
        let cache = TokenCache::new(HttpClient::new(), "http://unused".to_string(), None);
        assert!(!cache.is_configured());
        assert!(matches!(
            cache.get_or_refresh().await,
            Err(AppError::ExternalApi(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_an_error() {
        let router = Router::new().route(
            "/api/token",
            post(|| async { (StatusCode::BAD_REQUEST, "invalid_grant") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let cache = TokenCache::new(
            HttpClient::new(),
            format!("http://{}/api/token", addr),
            Some(credentials()),
        );
        assert!(cache.get_or_refresh().await.is_err());
    }
}
