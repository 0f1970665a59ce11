//! Event aggregation
//!
//! Turns a user's saved teams, artists and venues into a list of upcoming
//! events: one upstream query per keyword, merged in query order, restricted to
//! a rolling date window, de-duplicated and optionally narrowed to venues.
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::{
    models::{CanonicalEvent, Category, PreferenceSet},
    services::providers::{EventSource, SearchParams},
};

/// Result size used for the unfiltered "all events" queries
pub const ALL_EVENTS_SIZE: u32 = 200;

/// How saved preferences narrow the recommended events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPolicy {
    /// One query per team and per artist, then the venue filter
    #[default]
    Strict,
    /// Every Chicago event, kept when it matches a team or venue or is music
    Discovery,
}

pub struct Aggregator {
    source: Arc<dyn EventSource>,
    policy: RecommendationPolicy,
    window_months: u32,
    max_in_flight: usize,
}

impl Aggregator {
    pub fn new(
        source: Arc<dyn EventSource>,
        policy: RecommendationPolicy,
        window_months: u32,
        max_in_flight: usize,
    ) -> Self {
        Self {
            source,
            policy,
            window_months,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn policy(&self) -> RecommendationPolicy {
        self.policy
    }

    /// Upcoming events for a user's preferences, relative to `today`
    pub async fn recommended_events(
        &self,
        preferences: &PreferenceSet,
        today: NaiveDate,
    ) -> Vec<CanonicalEvent> {
        let end = window_end(today, self.window_months);

        let events = match self.policy {
            RecommendationPolicy::Strict => {
                let fetched = self.run_queries(strict_queries(preferences)).await;
                let in_window = within_window(fetched, today, end);
                filter_by_venue(dedup_by_id(in_window), &preferences.venues)
            }
            RecommendationPolicy::Discovery => {
                let all = self.all_events(ALL_EVENTS_SIZE).await;
                let matching: Vec<_> = if preferences.is_empty() {
                    all
                } else {
                    all.into_iter()
                        .filter(|event| discovery_match(event, preferences))
                        .collect()
                };
                within_window(matching, today, end)
            }
        };

        tracing::info!(
            policy = ?self.policy,
            teams = preferences.teams.len(),
            artists = preferences.artists.len(),
            venues = preferences.venues.len(),
            count = events.len(),
            "Aggregated recommended events"
        );

        events
    }

    /// Unfiltered Sports and Music events, de-duplicated
    pub async fn all_events(&self, size: u32) -> Vec<CanonicalEvent> {
        let queries = vec![
            SearchParams::classification(Category::Sports.classification_name()).with_size(size),
            SearchParams::classification(Category::Music.classification_name()).with_size(size),
        ];
        dedup_by_id(self.run_queries(queries).await)
    }

    /// Ad-hoc search used by the public browse endpoint
    pub async fn browse(
        &self,
        category: Option<Category>,
        keyword: Option<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Vec<CanonicalEvent> {
        let categories = match category {
            Some(category) => vec![category],
            None => vec![Category::Sports, Category::Music],
        };

        let start = start_date.map(|d| d.and_time(NaiveTime::MIN).and_utc());
        let end = end_date.map(end_of_day);

        let queries = categories
            .into_iter()
            .map(|category| {
                let params = SearchParams::classification(category.classification_name())
                    .with_range(start, end);
                match &keyword {
                    Some(keyword) => params.with_keyword(keyword.clone()),
                    None => params,
                }
            })
            .collect();

        dedup_by_id(self.run_queries(queries).await)
    }

    /// Issues queries with bounded concurrency and concatenates the results
    /// in query order
    async fn run_queries(&self, queries: Vec<SearchParams>) -> Vec<CanonicalEvent> {
        tracing::debug!(
            queries = queries.len(),
            max_in_flight = self.max_in_flight,
            source = self.source.name(),
            "Running event queries"
        );

        stream::iter(queries)
            .map(|params| self.source.search(params))
            .buffered(self.max_in_flight)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Sports queries followed by music queries. A category without keywords
/// gets one unfiltered query.
fn strict_queries(preferences: &PreferenceSet) -> Vec<SearchParams> {
    let mut queries = Vec::new();

    for (category, keywords) in [
        (Category::Sports, &preferences.teams),
        (Category::Music, &preferences.artists),
    ] {
        let classification = category.classification_name();
        if keywords.is_empty() {
            queries.push(SearchParams::classification(classification));
        } else {
            queries.extend(
                keywords
                    .iter()
                    .map(|keyword| SearchParams::classification(classification).with_keyword(keyword)),
            );
        }
    }

    queries
}

fn discovery_match(event: &CanonicalEvent, preferences: &PreferenceSet) -> bool {
    let title = event.title.to_lowercase();
    let team_match = preferences
        .teams
        .iter()
        .any(|team| title.contains(&team.to_lowercase()));

    team_match || event.category == Category::Music || venue_matches(&event.venue, &preferences.venues)
}

/// Last day of the window starting at `today`. Month arithmetic clamps to the
/// end of shorter months.
pub fn window_end(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Keeps events starting on a day in `[start, end]`
pub fn within_window(
    events: Vec<CanonicalEvent>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<CanonicalEvent> {
    events
        .into_iter()
        .filter(|event| (start..=end).contains(&event.start_date()))
        .collect()
}

/// First occurrence of each id wins; order is otherwise preserved
pub fn dedup_by_id(events: Vec<CanonicalEvent>) -> Vec<CanonicalEvent> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|event| seen.insert(event.id.clone()))
        .collect()
}

/// Keeps events whose venue contains one of `venues`, ignoring case.
/// An empty venue list keeps everything.
pub fn filter_by_venue(events: Vec<CanonicalEvent>, venues: &[String]) -> Vec<CanonicalEvent> {
    if venues.is_empty() {
        return events;
    }
    events
        .into_iter()
        .filter(|event| venue_matches(&event.venue, venues))
        .collect()
}

fn venue_matches(venue: &str, venues: &[String]) -> bool {
    let venue = venue.to_lowercase();
    venues.iter().any(|v| venue.contains(&v.to_lowercase()))
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
        .and_utc()
}
