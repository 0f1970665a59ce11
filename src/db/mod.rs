pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, PgStore};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;

use crate::{
    error::AppResult,
    models::{NewPreference, Preference, PreferenceKind, User, UserProfile},
};

/// Persistence boundary for users and their preferences
///
/// Preferences are partitioned by user id. Concurrent writes for the same
/// user are not ordered here; the backing store decides (last write wins).
#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> AppResult<Option<User>>;

    /// Creates the user or updates its profile fields
    async fn upsert_user(&self, user_id: &str, profile: UserProfile) -> AppResult<User>;

    /// Marks onboarding as completed. Returns `None` for an unknown user.
    async fn complete_onboarding(&self, user_id: &str) -> AppResult<Option<User>>;

    /// Lists preferences in insertion order, optionally restricted to one type
    async fn list_preferences(
        &self,
        user_id: &str,
        kind: Option<PreferenceKind>,
    ) -> AppResult<Vec<Preference>>;

    /// Inserts one preference row. Fails with `InvalidInput` for an unknown user.
    async fn add_preference(&self, preference: NewPreference) -> AppResult<Preference>;

    /// Removes every preference of the user with this item id; returns the count
    async fn remove_preference(&self, user_id: &str, item_id: &str) -> AppResult<u64>;

    /// Removes all preferences of one type; returns the count
    async fn clear_preferences(&self, user_id: &str, kind: PreferenceKind) -> AppResult<u64>;

    /// Removes the `removed` item ids of one type and inserts `added` as a
    /// single change. Rows of other types are untouched. Nothing is applied
    /// when any step fails.
    async fn apply_selection(
        &self,
        user_id: &str,
        kind: PreferenceKind,
        removed: &[String],
        added: Vec<NewPreference>,
    ) -> AppResult<Vec<Preference>>;
}
