pub mod aggregator;
pub mod calendar;
pub mod preference_selector;
pub mod preferences;
pub mod providers;
pub mod token_cache;

pub use aggregator::{Aggregator, RecommendationPolicy};
pub use providers::{EventSource, MusicCatalog, SearchParams};
pub use token_cache::{OAuthCredentials, TokenCache};
