//! Selection state for choosing teams, artists or venues
//!
//! One keyed store of [`PreferenceItem`]s is fed by the static catalog, live
//! search results and previously selected items. Everything a caller displays
//! or persists is derived from that store.
use std::collections::HashMap;

use serde::Serialize;

use crate::models::{PreferenceItem, PreferenceKind};

const CATALOG_TEAMS: &[&str] = &[
    "Chicago Bears",
    "Chicago Bulls",
    "Chicago Cubs",
    "Chicago White Sox",
    "Chicago Blackhawks",
    "Chicago Fire FC",
];

const CATALOG_ARTISTS: &[&str] = &[
    "Spoon",
    "The National",
    "Wilco",
    "Chance the Rapper",
    "Common",
];

const CATALOG_VENUES: &[&str] = &[
    "United Center",
    "Soldier Field",
    "Wrigley Field",
    "The Riviera Theatre",
    "Metro Chicago",
    "House of Blues",
];

/// Built-in options offered for a preference type
pub fn catalog(kind: PreferenceKind) -> Vec<PreferenceItem> {
    let names = match kind {
        PreferenceKind::Team => CATALOG_TEAMS,
        PreferenceKind::Artist => CATALOG_ARTISTS,
        PreferenceKind::Venue => CATALOG_VENUES,
    };
    names.iter().map(|name| PreferenceItem::named(*name)).collect()
}

/// Where an item was resolved from. Lower ranks take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ItemSource {
    Catalog,
    Search,
    Selected,
}

/// Result of a toggle: the new selection and every item a caller may need to
/// persist or display it
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectionChange {
    pub selected_ids: Vec<String>,
    pub items: Vec<PreferenceItem>,
}

#[derive(Debug, Clone)]
pub struct PreferenceSelector {
    catalog_ids: Vec<String>,
    items: HashMap<String, (PreferenceItem, ItemSource)>,
    search_results: Vec<String>,
    query: String,
    live_search: bool,
    selected: Vec<String>,
}

impl PreferenceSelector {
    pub fn new(catalog: Vec<PreferenceItem>, live_search: bool) -> Self {
        let mut selector = Self {
            catalog_ids: Vec::with_capacity(catalog.len()),
            items: HashMap::new(),
            search_results: Vec::new(),
            query: String::new(),
            live_search,
            selected: Vec::new(),
        };
        for item in catalog {
            selector.catalog_ids.push(item.id.clone());
            selector.upsert(item, ItemSource::Catalog);
        }
        selector
    }

    /// Selector over the built-in catalog of `kind`. Artists support live search.
    pub fn for_kind(kind: PreferenceKind) -> Self {
        Self::new(catalog(kind), kind == PreferenceKind::Artist)
    }

    /// Seeds the selection with previously saved items
    pub fn with_selected(mut self, items: impl IntoIterator<Item = PreferenceItem>) -> Self {
        for item in items {
            if !self.selected.contains(&item.id) {
                self.selected.push(item.id.clone());
            }
            self.upsert(item, ItemSource::Selected);
        }
        self
    }

    /// Inserts or replaces an item unless a more authoritative source already
    /// resolved the same id
    fn upsert(&mut self, item: PreferenceItem, source: ItemSource) {
        match self.items.get(&item.id) {
            Some((_, existing)) if *existing < source => {}
            _ => {
                self.items.insert(item.id.clone(), (item, source));
            }
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Records the latest live search results. Earlier results stay resolvable.
    pub fn set_search_results(&mut self, results: Vec<PreferenceItem>) {
        self.search_results = results.iter().map(|item| item.id.clone()).collect();
        for item in results {
            self.upsert(item, ItemSource::Search);
        }
    }

    pub fn resolve(&self, id: &str) -> Option<&PreferenceItem> {
        self.items.get(id).map(|(item, _)| item)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn selected_ids(&self) -> &[String] {
        &self.selected
    }

    /// Adds `id` to the selection, or removes it when already selected
    pub fn toggle(&mut self, id: &str) -> SelectionChange {
        if self.is_selected(id) {
            self.selected.retain(|s| s != id);
        } else {
            if !self.items.contains_key(id) {
                self.upsert(PreferenceItem::named(id), ItemSource::Selected);
            }
            self.selected.push(id.to_string());
        }
        self.change()
    }

    /// Current selection with catalog and selected items resolved
    pub fn change(&self) -> SelectionChange {
        let mut items: Vec<PreferenceItem> = Vec::new();
        for id in self.catalog_ids.iter().chain(self.selected.iter()) {
            if items.iter().any(|item| &item.id == id) {
                continue;
            }
            if let Some(item) = self.resolve(id) {
                items.push(item.clone());
            }
        }

        SelectionChange {
            selected_ids: self.selected.clone(),
            items,
        }
    }

    /// Options to show for the current query
    pub fn displayed_options(&self) -> Vec<PreferenceItem> {
        let query = self.query.trim().to_lowercase();

        let live = self.live_search && !query.is_empty();
        let ids = if live {
            &self.search_results
        } else {
            &self.catalog_ids
        };

        ids.iter()
            .filter_map(|id| self.resolve(id))
            .filter(|item| live || item.name.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }
}
