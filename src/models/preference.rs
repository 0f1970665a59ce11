use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceKind {
    Team,
    Artist,
    Venue,
}

impl PreferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKind::Team => "team",
            PreferenceKind::Artist => "artist",
            PreferenceKind::Venue => "venue",
        }
    }
}

impl Display for PreferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PreferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "team" => Ok(PreferenceKind::Team),
            "artist" => Ok(PreferenceKind::Artist),
            "venue" => Ok(PreferenceKind::Venue),
            other => Err(format!("Unknown preference type '{}'", other)),
        }
    }
}

/// A saved team, artist or venue preference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    pub id: i64,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: PreferenceKind,
    pub item_id: String,
    pub item_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A preference about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewPreference {
    pub user_id: String,
    pub kind: PreferenceKind,
    pub item_id: String,
    pub item_name: String,
    pub item_image: Option<String>,
}

/// Addressable option in a preference selector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferenceItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl PreferenceItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: None,
        }
    }

    /// Item whose id is its display name, as used for upstream keyword search
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name)
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }
}

impl From<&Preference> for PreferenceItem {
    fn from(preference: &Preference) -> Self {
        Self {
            id: preference.item_id.clone(),
            name: preference.item_name.clone(),
            image: preference.item_image.clone(),
        }
    }
}

/// Keywords grouped by preference type, as consumed by the event aggregator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceSet {
    pub teams: Vec<String>,
    pub artists: Vec<String>,
    pub venues: Vec<String>,
}

impl PreferenceSet {
    /// Groups saved preferences by type, using the item name as search keyword
    pub fn from_preferences(preferences: &[Preference]) -> Self {
        let mut set = Self::default();
        for preference in preferences {
            let bucket = match preference.kind {
                PreferenceKind::Team => &mut set.teams,
                PreferenceKind::Artist => &mut set.artists,
                PreferenceKind::Venue => &mut set.venues,
            };
            if !bucket.contains(&preference.item_name) {
                bucket.push(preference.item_name.clone());
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty() && self.artists.is_empty() && self.venues.is_empty()
    }
}
