use std::collections::HashSet;

use serde::Serialize;

use crate::{
    db::PreferenceStore,
    error::{AppError, AppResult},
    models::{NewPreference, Preference, PreferenceItem, PreferenceKind},
    services::{preference_selector::PreferenceSelector, providers::MusicCatalog},
};

/// Default number of top artists read during an import
pub const DEFAULT_IMPORT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SyncOutcome {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ImportOutcome {
    pub imported: usize,
    pub artists: Vec<String>,
}

/// Validates and stores a single preference
pub async fn add_preference(
    store: &dyn PreferenceStore,
    preference: NewPreference,
) -> AppResult<Preference> {
    if preference.item_id.trim().is_empty() || preference.item_name.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "itemId and itemName must not be empty".to_string(),
        ));
    }

    let stored = store.add_preference(preference).await?;
    tracing::info!(
        user_id = %stored.user_id,
        kind = %stored.kind,
        item_id = %stored.item_id,
        "Preference added"
    );

    Ok(stored)
}

/// Makes the stored preferences of one type match `desired`
///
/// Items no longer present are removed; new items are added with the names
/// and images carried in `desired`. Other types are left alone and the
/// change is applied as a whole or not at all.
pub async fn sync_selection(
    store: &dyn PreferenceStore,
    user_id: &str,
    kind: PreferenceKind,
    desired: Vec<PreferenceItem>,
) -> AppResult<SyncOutcome> {
    if desired.iter().any(|item| item.id.trim().is_empty()) {
        return Err(AppError::InvalidInput("Item ids must not be empty".to_string()));
    }

    let current = store.list_preferences(user_id, Some(kind)).await?;
    let mut selector = PreferenceSelector::for_kind(kind)
        .with_selected(current.iter().map(PreferenceItem::from));

    let desired_ids: HashSet<String> = desired.iter().map(|item| item.id.clone()).collect();
    let stored_ids: Vec<String> = selector.selected_ids().to_vec();
    selector.set_search_results(desired.clone());

    let mut outcome = SyncOutcome::default();

    for id in stored_ids.iter().filter(|id| !desired_ids.contains(*id)) {
        selector.toggle(id);
        outcome.removed.push(id.clone());
    }

    let mut additions = Vec::new();
    for item in &desired {
        if selector.is_selected(&item.id) {
            continue;
        }
        let change = selector.toggle(&item.id);
        let resolved = change
            .items
            .iter()
            .find(|resolved| resolved.id == item.id)
            .cloned()
            .unwrap_or_else(|| item.clone());

        outcome.added.push(resolved.id.clone());
        additions.push(NewPreference {
            user_id: user_id.to_string(),
            kind,
            item_id: resolved.id,
            item_name: resolved.name,
            item_image: resolved.image,
        });
    }

    if !outcome.added.is_empty() || !outcome.removed.is_empty() {
        store
            .apply_selection(user_id, kind, &outcome.removed, additions)
            .await?;
    }

    tracing::info!(
        user_id = %user_id,
        kind = %kind,
        added = outcome.added.len(),
        removed = outcome.removed.len(),
        "Preference selection synced"
    );

    Ok(outcome)
}

/// Adds the connected account's top artists as artist preferences
///
/// Artists already saved are skipped. Each artist is stored under its name,
/// which is also the keyword used for event search.
pub async fn import_top_artists(
    store: &dyn PreferenceStore,
    catalog: &dyn MusicCatalog,
    user_id: &str,
    limit: u32,
) -> AppResult<ImportOutcome> {
    if store.get_user(user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    let top_artists = catalog.top_artists_paged(limit).await;
    let current = store
        .list_preferences(user_id, Some(PreferenceKind::Artist))
        .await?;

    let mut selector = PreferenceSelector::for_kind(PreferenceKind::Artist)
        .with_selected(current.iter().map(PreferenceItem::from));
    selector.set_search_results(
        top_artists
            .iter()
            .map(|artist| PreferenceItem::named(artist.name.clone()).with_image(artist.image.clone()))
            .collect(),
    );

    let mut outcome = ImportOutcome::default();

    for artist in &top_artists {
        if selector.is_selected(&artist.name) {
            continue;
        }
        selector.toggle(&artist.name);

        store
            .add_preference(NewPreference {
                user_id: user_id.to_string(),
                kind: PreferenceKind::Artist,
                item_id: artist.name.clone(),
                item_name: artist.name.clone(),
                item_image: artist.image.clone(),
            })
            .await?;
        outcome.artists.push(artist.name.clone());
    }
    outcome.imported = outcome.artists.len();

    tracing::info!(
        user_id = %user_id,
        provider = catalog.name(),
        fetched = top_artists.len(),
        imported = outcome.imported,
        "Imported top artists"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::InMemoryStore,
        models::{Artist, UserProfile},
    };

    struct FixedCatalog(Vec<Artist>);

    #[async_trait::async_trait]
    impl MusicCatalog for FixedCatalog {
        async fn search_artists(&self, _query: &str, _limit: u32) -> Vec<Artist> {
            Vec::new()
        }

        async fn top_artists(&self, limit: u32, offset: u32) -> Vec<Artist> {
            self.0
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect()
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn artist(name: &str) -> Artist {
        Artist {
            id: name.to_lowercase(),
            name: name.to_string(),
            image: Some(format!("https://img/{}.jpg", name.to_lowercase())),
            genres: Vec::new(),
            popularity: None,
        }
    }

    async fn store_with_user(user_id: &str) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.upsert_user(user_id, UserProfile::default()).await.unwrap();
        store
    }

    fn names(preferences: &[Preference]) -> Vec<&str> {
        preferences.iter().map(|p| p.item_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_sync_adds_and_removes() {
        let store = store_with_user("u1").await;
        for team in ["Chicago Bears", "Chicago Cubs"] {
            add_preference(
                &store,
                NewPreference {
                    user_id: "u1".to_string(),
                    kind: PreferenceKind::Team,
                    item_id: team.to_string(),
                    item_name: team.to_string(),
                    item_image: None,
                },
            )
            .await
            .unwrap();
        }

        let outcome = sync_selection(
            &store,
            "u1",
            PreferenceKind::Team,
            vec![
                PreferenceItem::named("Chicago Cubs"),
                PreferenceItem::new("chicago-red-stars", "Chicago Red Stars")
                    .with_image(Some("https://img/stars.png".to_string())),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.removed, vec!["Chicago Bears"]);
        assert_eq!(outcome.added, vec!["chicago-red-stars"]);

        let teams = store
            .list_preferences("u1", Some(PreferenceKind::Team))
            .await
            .unwrap();
        assert_eq!(names(&teams), vec!["Chicago Cubs", "Chicago Red Stars"]);
        assert_eq!(teams[1].item_image.as_deref(), Some("https://img/stars.png"));
    }

    #[tokio::test]
    async fn test_sync_keeps_same_item_id_of_other_types() {
        let store = store_with_user("u1").await;
        for kind in [PreferenceKind::Artist, PreferenceKind::Venue] {
            add_preference(
                &store,
                NewPreference {
                    user_id: "u1".to_string(),
                    kind,
                    item_id: "House of Blues".to_string(),
                    item_name: "House of Blues".to_string(),
                    item_image: None,
                },
            )
            .await
            .unwrap();
        }

        let outcome = sync_selection(&store, "u1", PreferenceKind::Venue, Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome.removed, vec!["House of Blues"]);

        let remaining = store.list_preferences("u1", None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].kind, PreferenceKind::Artist);
    }

    #[tokio::test]
    async fn test_failed_sync_leaves_selection_unchanged() {
        let store = InMemoryStore::new();

        let result = sync_selection(
            &store,
            "ghost",
            PreferenceKind::Team,
            vec![PreferenceItem::named("Chicago Cubs")],
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(store.list_preferences("ghost", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_to_same_selection_is_a_no_op() {
        let store = store_with_user("u1").await;
        let desired = vec![PreferenceItem::named("Metro Chicago")];

        sync_selection(&store, "u1", PreferenceKind::Venue, desired.clone())
            .await
            .unwrap();
        let second = sync_selection(&store, "u1", PreferenceKind::Venue, desired)
            .await
            .unwrap();

        assert_eq!(second, SyncOutcome::default());
        assert_eq!(store.list_preferences("u1", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_preference_rejects_blank_fields() {
        let store = store_with_user("u1").await;
        let result = add_preference(
            &store,
            NewPreference {
                user_id: "u1".to_string(),
                kind: PreferenceKind::Artist,
                item_id: "  ".to_string(),
                item_name: "Wilco".to_string(),
                item_image: None,
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_import_skips_existing_artists() {
        let store = store_with_user("u1").await;
        sync_selection(
            &store,
            "u1",
            PreferenceKind::Artist,
            vec![PreferenceItem::named("Wilco")],
        )
        .await
        .unwrap();

        let catalog = FixedCatalog(vec![artist("Wilco"), artist("Spoon"), artist("Beach House")]);
        let outcome = import_top_artists(&store, &catalog, "u1", DEFAULT_IMPORT_LIMIT)
            .await
            .unwrap();

        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.artists, vec!["Spoon", "Beach House"]);

        let artists = store
            .list_preferences("u1", Some(PreferenceKind::Artist))
            .await
            .unwrap();
        assert_eq!(names(&artists), vec!["Wilco", "Spoon", "Beach House"]);
        assert_eq!(artists[2].item_image.as_deref(), Some("https://img/beach house.jpg"));
    }

    #[tokio::test]
    async fn test_import_for_unknown_user_is_not_found() {
        let store = InMemoryStore::new();
        let catalog = FixedCatalog(vec![artist("Spoon")]);

        let result = import_top_artists(&store, &catalog, "ghost", 10).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
