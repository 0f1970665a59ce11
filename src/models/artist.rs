// ============================================================================
// Spotify Web API Types
// ============================================================================

use serde::{Deserialize, Serialize};

/// Artist as exposed to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u32>,
}

/// Raw artist object from the Spotify Web API
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

/// Paging object wrapping artist lists
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPage {
    #[serde(default)]
    pub items: Vec<SpotifyArtist>,
}

/// Response from GET /search?type=artist
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySearchResponse {
    pub artists: SpotifyPage,
}

/// Response from the accounts token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

impl From<SpotifyArtist> for Artist {
    fn from(artist: SpotifyArtist) -> Self {
        Artist {
            id: artist.id,
            name: artist.name,
            // Spotify lists images widest first
            image: artist.images.into_iter().next().map(|i| i.url),
            genres: artist.genres,
            popularity: artist.popularity,
        }
    }
}
