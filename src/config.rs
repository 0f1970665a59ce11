use serde::Deserialize;

use crate::services::aggregator::RecommendationPolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL. Without it preferences live in memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL used for caching upstream event searches
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Ticketmaster Discovery API key
    #[serde(default)]
    pub ticketmaster_api_key: String,

    /// Ticketmaster Discovery API base URL
    #[serde(default = "default_ticketmaster_api_url")]
    pub ticketmaster_api_url: String,

    /// Designated Market Area every event query is scoped to
    #[serde(default = "default_dma_id")]
    pub ticketmaster_dma_id: String,

    #[serde(default)]
    pub spotify_client_id: Option<String>,

    #[serde(default)]
    pub spotify_client_secret: Option<String>,

    /// Refresh token of the connected Spotify account
    #[serde(default)]
    pub spotify_refresh_token: Option<String>,

    #[serde(default = "default_spotify_api_url")]
    pub spotify_api_url: String,

    #[serde(default = "default_spotify_accounts_url")]
    pub spotify_accounts_url: String,

    /// Header carrying the user id forwarded by the identity provider
    #[serde(default = "default_auth_user_header")]
    pub auth_user_header: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout for upstream calls, in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    #[serde(default = "default_upstream_requests_per_second")]
    pub upstream_requests_per_second: u32,

    /// Maximum number of per-keyword event queries in flight at once
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,

    #[serde(default = "default_event_cache_ttl_secs")]
    pub event_cache_ttl_secs: u64,

    /// Length of the rolling recommendation window, in months from today
    #[serde(default = "default_recommendation_window_months")]
    pub recommendation_window_months: u32,

    #[serde(default)]
    pub recommendation_policy: RecommendationPolicy,
}

fn default_ticketmaster_api_url() -> String {
    "https://app.ticketmaster.com/discovery/v2".to_string()
}

fn default_dma_id() -> String {
    // Chicago
    "249".to_string()
}

fn default_spotify_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_spotify_accounts_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_auth_user_header() -> String {
    "x-authenticated-user".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_upstream_requests_per_second() -> u32 {
    5
}

fn default_max_concurrent_queries() -> usize {
    5
}

fn default_event_cache_ttl_secs() -> u64 {
    300
}

fn default_recommendation_window_months() -> u32 {
    6
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
