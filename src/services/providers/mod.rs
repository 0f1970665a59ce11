//! Upstream data providers
//!
//! Event search (Ticketmaster Discovery) and the music catalog (Spotify) sit
//! behind traits so the aggregation and import flows can be exercised without
//! the network. Both providers absorb their own failures: callers only ever
//! see results or an empty list.
use chrono::{DateTime, Utc};

use crate::models::{Artist, CanonicalEvent};

pub mod spotify;
pub mod ticketmaster;

/// Default result-size cap for a single event search
pub const DEFAULT_SEARCH_SIZE: u32 = 50;

/// Largest page the music catalog serves for top artists
pub const TOP_ARTISTS_PAGE_SIZE: u32 = 50;

/// Parameters of a single upstream event query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub classification_name: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub size: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            keyword: None,
            classification_name: None,
            start: None,
            end: None,
            size: DEFAULT_SEARCH_SIZE,
        }
    }
}

impl SearchParams {
    /// Query scoped to an upstream classification such as "Sports"
    pub fn classification(name: impl Into<String>) -> Self {
        Self {
            classification_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn with_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Short label for logs
    pub fn label(&self) -> &str {
        self.keyword
            .as_deref()
            .or(self.classification_name.as_deref())
            .unwrap_or("all")
    }
}

/// Source of canonical events
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Runs one query. Upstream failures yield an empty list.
    async fn search(&self, params: SearchParams) -> Vec<CanonicalEvent>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Source of artists for live search and preference import
#[async_trait::async_trait]
pub trait MusicCatalog: Send + Sync {
    /// Live artist-name search. Failures yield an empty list.
    async fn search_artists(&self, query: &str, limit: u32) -> Vec<Artist>;

    /// One page of the connected account's top artists
    async fn top_artists(&self, limit: u32, offset: u32) -> Vec<Artist>;

    /// Reads top artists page by page until `total` is reached or a short
    /// page signals the end of the list
    async fn top_artists_paged(&self, total: u32) -> Vec<Artist> {
        let mut artists = Vec::new();
        let mut offset = 0;

        while offset < total {
            let limit = TOP_ARTISTS_PAGE_SIZE.min(total - offset);
            let page = self.top_artists(limit, offset).await;
            let page_len = page.len() as u32;
            artists.extend(page);

            if page_len < limit {
                break;
            }
            offset += limit;
        }

        artists
    }

    fn name(&self) -> &'static str;
}
