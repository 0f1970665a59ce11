// ============================================================================
// Ticketmaster Discovery API Types
// ============================================================================

use serde::Deserialize;

/// Raw response from GET /events.json
#[derive(Debug, Clone, Deserialize)]
pub struct TicketmasterResponse {
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<TicketmasterEmbedded>,
}

impl TicketmasterResponse {
    /// Consumes the response, yielding its events (empty when `_embedded` is absent)
    pub fn into_events(self) -> Vec<TicketmasterEvent> {
        self.embedded.map(|e| e.events).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketmasterEmbedded {
    #[serde(default)]
    pub events: Vec<TicketmasterEvent>,
}

/// A single event record as returned upstream
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketmasterEvent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub images: Vec<TicketmasterImage>,
    pub dates: TicketmasterDates,
    #[serde(default)]
    pub classifications: Vec<TicketmasterClassification>,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<TicketmasterEventEmbedded>,
    #[serde(default)]
    pub price_ranges: Vec<TicketmasterPriceRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketmasterImage {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketmasterDates {
    pub start: TicketmasterStart,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketmasterStart {
    #[serde(default)]
    pub local_date: Option<String>,
    #[serde(default)]
    pub local_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketmasterClassification {
    #[serde(default)]
    pub segment: Option<TicketmasterNamed>,
    #[serde(default)]
    pub genre: Option<TicketmasterNamed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketmasterNamed {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketmasterEventEmbedded {
    #[serde(default)]
    pub venues: Vec<TicketmasterNamed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketmasterPriceRange {
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
}
