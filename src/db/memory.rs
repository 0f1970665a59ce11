use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::PreferenceStore;
use crate::{
    error::{AppError, AppResult},
    models::{NewPreference, Preference, PreferenceKind, User, UserProfile},
};

/// Preference store kept in process memory
///
/// Used when no database is configured and by the HTTP tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<InMemoryStoreInner>>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    users: HashMap<String, User>,
    preferences: Vec<Preference>,
    next_preference_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PreferenceStore for InMemoryStore {
    async fn get_user(&self, user_id: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(user_id).cloned())
    }

    async fn upsert_user(&self, user_id: &str, profile: UserProfile) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        let user = inner
            .users
            .entry(user_id.to_string())
            .and_modify(|user| {
                if profile.email.is_some() {
                    user.email = profile.email.clone();
                }
                if profile.name.is_some() {
                    user.name = profile.name.clone();
                }
                user.updated_at = now;
            })
            .or_insert_with(|| User {
                id: user_id.to_string(),
                email: profile.email.clone(),
                name: profile.name.clone(),
                onboarding_completed: false,
                created_at: now,
                updated_at: now,
            });

        Ok(user.clone())
    }

    async fn complete_onboarding(&self, user_id: &str) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(user_id).map(|user| {
            user.onboarding_completed = true;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn list_preferences(
        &self,
        user_id: &str,
        kind: Option<PreferenceKind>,
    ) -> AppResult<Vec<Preference>> {
        let inner = self.inner.read().await;
        Ok(inner
            .preferences
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter(|p| kind.map_or(true, |k| p.kind == k))
            .cloned()
            .collect())
    }

    async fn add_preference(&self, preference: NewPreference) -> AppResult<Preference> {
        let mut inner = self.inner.write().await;

        if !inner.users.contains_key(&preference.user_id) {
            return Err(AppError::InvalidInput(format!(
                "Unknown user {}",
                preference.user_id
            )));
        }

        inner.next_preference_id += 1;
        let stored = Preference {
            id: inner.next_preference_id,
            user_id: preference.user_id,
            kind: preference.kind,
            item_id: preference.item_id,
            item_name: preference.item_name,
            item_image: preference.item_image,
            created_at: Utc::now(),
        };
        inner.preferences.push(stored.clone());

        Ok(stored)
    }

    async fn remove_preference(&self, user_id: &str, item_id: &str) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.preferences.len();
        inner
            .preferences
            .retain(|p| !(p.user_id == user_id && p.item_id == item_id));
        Ok((before - inner.preferences.len()) as u64)
    }

    async fn clear_preferences(&self, user_id: &str, kind: PreferenceKind) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.preferences.len();
        inner
            .preferences
            .retain(|p| !(p.user_id == user_id && p.kind == kind));
        Ok((before - inner.preferences.len()) as u64)
    }

    async fn apply_selection(
        &self,
        user_id: &str,
        kind: PreferenceKind,
        removed: &[String],
        added: Vec<NewPreference>,
    ) -> AppResult<Vec<Preference>> {
        let mut inner = self.inner.write().await;

        if let Some(unknown) = added
            .iter()
            .find(|p| !inner.users.contains_key(&p.user_id))
        {
            return Err(AppError::InvalidInput(format!("Unknown user {}", unknown.user_id)));
        }

        inner.preferences.retain(|p| {
            !(p.user_id == user_id && p.kind == kind && removed.contains(&p.item_id))
        });

        let now = Utc::now();
        let mut stored = Vec::with_capacity(added.len());
        for preference in added {
            inner.next_preference_id += 1;
            let row = Preference {
                id: inner.next_preference_id,
                user_id: preference.user_id,
                kind: preference.kind,
                item_id: preference.item_id,
                item_name: preference.item_name,
                item_image: preference.item_image,
                created_at: now,
            };
            inner.preferences.push(row.clone());
            stored.push(row);
        }

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_preference(user_id: &str, kind: PreferenceKind, name: &str) -> NewPreference {
        NewPreference {
            user_id: user_id.to_string(),
            kind,
            item_id: name.to_string(),
            item_name: name.to_string(),
            item_image: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_complete_onboarding() {
        let store = InMemoryStore::new();
        assert_eq!(store.get_user("u1").await.unwrap(), None);

        let user = store
            .upsert_user(
                "u1",
                UserProfile {
                    email: Some("fan@example.com".to_string()),
                    name: None,
                },
            )
            .await
            .unwrap();
        assert!(!user.onboarding_completed);

        let updated = store
            .upsert_user(
                "u1",
                UserProfile {
                    email: None,
                    name: Some("Fan".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email.as_deref(), Some("fan@example.com"));
        assert_eq!(updated.name.as_deref(), Some("Fan"));

        let completed = store.complete_onboarding("u1").await.unwrap().unwrap();
        assert!(completed.onboarding_completed);
        assert_eq!(store.complete_onboarding("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_preferences_are_partitioned_by_user() {
        let store = InMemoryStore::new();
        store.upsert_user("a", UserProfile::default()).await.unwrap();
        store.upsert_user("b", UserProfile::default()).await.unwrap();

        store
            .add_preference(new_preference("a", PreferenceKind::Team, "Chicago Bears"))
            .await
            .unwrap();
        store
            .add_preference(new_preference("a", PreferenceKind::Venue, "Soldier Field"))
            .await
            .unwrap();
        store
            .add_preference(new_preference("b", PreferenceKind::Team, "Chicago Bears"))
            .await
            .unwrap();

        assert_eq!(store.list_preferences("a", None).await.unwrap().len(), 2);
        let teams = store
            .list_preferences("a", Some(PreferenceKind::Team))
            .await
            .unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].item_name, "Chicago Bears");

        assert_eq!(store.remove_preference("a", "Chicago Bears").await.unwrap(), 1);
        assert_eq!(store.list_preferences("b", None).await.unwrap().len(), 1);

        assert_eq!(
            store
                .clear_preferences("a", PreferenceKind::Venue)
                .await
                .unwrap(),
            1
        );
        assert!(store.list_preferences("a", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_preference_for_unknown_user_is_invalid() {
        let store = InMemoryStore::new();
        let result = store
            .add_preference(new_preference("ghost", PreferenceKind::Artist, "Wilco"))
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_apply_selection_only_touches_one_type() {
        let store = InMemoryStore::new();
        store.upsert_user("a", UserProfile::default()).await.unwrap();
        store
            .add_preference(new_preference("a", PreferenceKind::Artist, "House of Blues"))
            .await
            .unwrap();
        store
            .add_preference(new_preference("a", PreferenceKind::Venue, "House of Blues"))
            .await
            .unwrap();

        let added = store
            .apply_selection(
                "a",
                PreferenceKind::Venue,
                &["House of Blues".to_string()],
                vec![new_preference("a", PreferenceKind::Venue, "Metro Chicago")],
            )
            .await
            .unwrap();
        assert_eq!(added.len(), 1);

        let artists = store
            .list_preferences("a", Some(PreferenceKind::Artist))
            .await
            .unwrap();
        assert_eq!(artists.len(), 1);
        let venues = store
            .list_preferences("a", Some(PreferenceKind::Venue))
            .await
            .unwrap();
        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].item_name, "Metro Chicago");
    }

    #[tokio::test]
    async fn test_apply_selection_for_unknown_user_changes_nothing() {
        let store = InMemoryStore::new();
        store.upsert_user("a", UserProfile::default()).await.unwrap();
        store
            .add_preference(new_preference("a", PreferenceKind::Team, "Chicago Bears"))
            .await
            .unwrap();

        let result = store
            .apply_selection(
                "a",
                PreferenceKind::Team,
                &["Chicago Bears".to_string()],
                vec![new_preference("ghost", PreferenceKind::Team, "Chicago Cubs")],
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(store.list_preferences("a", None).await.unwrap().len(), 1);
    }
}
