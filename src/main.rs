use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderName;
use reqwest::Client as HttpClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chievents_api::{
    config::Config,
    db::{create_pool, create_redis_client, Cache, InMemoryStore, PgStore, PreferenceStore},
    routes::{create_router, AppState},
    services::{
        providers::{
            spotify::SpotifyClient,
            ticketmaster::{TicketmasterClient, TicketmasterSettings},
        },
        Aggregator, OAuthCredentials, TokenCache,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chievents_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn PreferenceStore> = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url).await?;
            tracing::info!("Using PostgreSQL preference store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, preferences are kept in memory");
            Arc::new(InMemoryStore::new())
        }
    };

    let (cache, cache_handle) = match &config.redis_url {
        Some(redis_url) => {
            let (cache, handle) = Cache::new(create_redis_client(redis_url)?).await;
            (Some(cache), Some(handle))
        }
        None => (None, None),
    };

    if config.ticketmaster_api_key.is_empty() {
        tracing::warn!("TICKETMASTER_API_KEY not set, event searches will return nothing");
    }

    let upstream_timeout = Duration::from_secs(config.upstream_timeout_secs);

    let ticketmaster = TicketmasterClient::new(
        TicketmasterSettings {
            api_key: config.ticketmaster_api_key.clone(),
            api_url: config.ticketmaster_api_url.clone(),
            dma_id: config.ticketmaster_dma_id.clone(),
            timeout: upstream_timeout,
            requests_per_second: config.upstream_requests_per_second,
            cache_ttl: config.event_cache_ttl_secs,
        },
        cache.clone(),
    )?;

    let aggregator = Aggregator::new(
        Arc::new(ticketmaster),
        config.recommendation_policy,
        config.recommendation_window_months,
        config.max_concurrent_queries,
    );
    tracing::info!(
        policy = ?aggregator.policy(),
        window_months = config.recommendation_window_months,
        "Recommendation policy configured"
    );

    let spotify_credentials = match (
        &config.spotify_client_id,
        &config.spotify_client_secret,
        &config.spotify_refresh_token,
    ) {
        (Some(client_id), Some(client_secret), Some(refresh_token)) => Some(OAuthCredentials {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            refresh_token: refresh_token.clone(),
        }),
        _ => None,
    };

    let spotify_http = HttpClient::builder().timeout(upstream_timeout).build()?;
    let tokens = Arc::new(TokenCache::new(
        spotify_http.clone(),
        config.spotify_accounts_url.clone(),
        spotify_credentials,
    ));
    if !tokens.is_configured() {
        tracing::warn!("Spotify credentials incomplete, artist search and import are disabled");
    }
    let spotify = SpotifyClient::new(spotify_http, config.spotify_api_url.clone(), tokens, cache);

    let auth_header = HeaderName::try_from(config.auth_user_header.to_lowercase())
        .context("AUTH_USER_HEADER is not a valid header name")?;

    let state = Arc::new(AppState {
        store,
        aggregator,
        music_catalog: Arc::new(spotify),
        auth_header,
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
