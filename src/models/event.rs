use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::ticketmaster::{TicketmasterEvent, TicketmasterImage};

/// Venue name used when upstream has no venue for an event
pub const VENUE_TBD: &str = "Venue TBD";

/// Time label used when upstream has no local start time
pub const TIME_TBD: &str = "TBD";

/// Separator between the date and time parts of a display date
pub const DATE_TIME_SEPARATOR: &str = " · ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sports,
    Music,
}

impl Category {
    /// Derives the category from an upstream segment name.
    ///
    /// Anything whose segment does not mention "sport" is treated as music,
    /// including a missing segment.
    pub fn from_segment(segment: Option<&str>) -> Self {
        match segment {
            Some(name) if name.to_lowercase().contains("sport") => Category::Sports,
            _ => Category::Music,
        }
    }

    /// Upstream classification name used to scope searches to this category
    pub fn classification_name(&self) -> &'static str {
        match self {
            Category::Sports => "Sports",
            Category::Music => "Music",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Sports => write!(f, "sports"),
            Category::Music => write!(f, "music"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sports" => Ok(Category::Sports),
            "music" => Ok(Category::Music),
            other => Err(format!("Unknown event category '{}'", other)),
        }
    }
}

/// Normalized event returned to clients
///
/// `starts_at` is the machine-readable start and the only field used for
/// filtering and bucketing. `date` and `time` are display strings derived from
/// it and are never parsed back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEvent {
    pub id: String,
    pub title: String,
    pub starts_at: NaiveDateTime,
    pub time_tbd: bool,
    pub date: String,
    pub time: String,
    pub venue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub image: String,
    pub category: Category,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CanonicalEvent {
    /// Calendar date the event starts on
    pub fn start_date(&self) -> NaiveDate {
        self.starts_at.date()
    }
}

/// Reasons an upstream record cannot be normalized
#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    #[error("event {0} has no local start date")]
    MissingDate(String),

    #[error("event {id} has an invalid local date '{value}'")]
    InvalidDate { id: String, value: String },
}

/// Formats the display date, e.g. "Nov 24, 2024"
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Formats the display time, e.g. "7:00 PM"
pub fn format_display_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Parses the date portion of a legacy display string such as
/// "Oct 22, 2025 · 7:00 PM". Returns `None` when it is not a date.
pub fn parse_display_date(display: &str) -> Option<NaiveDate> {
    let date_part = display.split(DATE_TIME_SEPARATOR).next()?.trim();
    NaiveDate::parse_from_str(date_part, "%b %d, %Y").ok()
}

fn parse_local_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Formats a price minimum the way it is shown to users ("From $25", "From $25.5")
fn format_price(min: f64) -> String {
    format!("From ${}", min)
}

/// Picks the widest image, keeping the first one on ties
fn widest_image(images: &[TicketmasterImage]) -> Option<&TicketmasterImage> {
    images
        .iter()
        .reduce(|best, image| if image.width > best.width { image } else { best })
}

impl TryFrom<TicketmasterEvent> for CanonicalEvent {
    type Error = NormalizeError;

    fn try_from(event: TicketmasterEvent) -> Result<Self, Self::Error> {
        let local_date = event
            .dates
            .start
            .local_date
            .as_deref()
            .ok_or_else(|| NormalizeError::MissingDate(event.id.clone()))?;

        let date = NaiveDate::parse_from_str(local_date, "%Y-%m-%d").map_err(|_| {
            NormalizeError::InvalidDate {
                id: event.id.clone(),
                value: local_date.to_string(),
            }
        })?;

        // An absent or unreadable time still yields a comparable timestamp at midnight
        let local_time = event.dates.start.local_time.as_deref().and_then(parse_local_time);
        let starts_at = date.and_time(local_time.unwrap_or(NaiveTime::MIN));

        let time = local_time
            .map(format_display_time)
            .unwrap_or_else(|| TIME_TBD.to_string());

        let category = Category::from_segment(
            event
                .classifications
                .first()
                .and_then(|c| c.segment.as_ref())
                .and_then(|s| s.name.as_deref()),
        );

        let venue = event
            .embedded
            .as_ref()
            .and_then(|e| e.venues.first())
            .and_then(|v| v.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| VENUE_TBD.to_string());

        let image = widest_image(&event.images)
            .map(|i| i.url.clone())
            .unwrap_or_default();

        let price = event.price_ranges.first().map(|p| format_price(p.min));

        Ok(CanonicalEvent {
            id: event.id,
            title: event.name,
            starts_at,
            time_tbd: local_time.is_none(),
            date: format!("{}{}{}", format_display_date(date), DATE_TIME_SEPARATOR, time),
            time,
            venue,
            price,
            image,
            category,
            url: event.url,
            description: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_event(json: serde_json::Value) -> TicketmasterEvent {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_category_from_segment() {
        assert_eq!(Category::from_segment(Some("Sports")), Category::Sports);
        assert_eq!(Category::from_segment(Some("MOTORSPORTS")), Category::Sports);
        assert_eq!(Category::from_segment(Some("Music")), Category::Music);
        assert_eq!(Category::from_segment(Some("Arts & Theatre")), Category::Music);
        assert_eq!(Category::from_segment(None), Category::Music);
    }

    #[test]
    fn test_normalize_full_record() {
        let event = raw_event(serde_json::json!({
            "id": "vv1A",
            "name": "Chicago Bulls vs. Detroit Pistons",
            "url": "https://www.ticketmaster.com/event/vv1A",
            "images": [
                { "url": "https://img/small.jpg", "width": 100, "height": 56 },
                { "url": "https://img/large.jpg", "width": 2048, "height": 1152 },
                { "url": "https://img/medium.jpg", "width": 640, "height": 360 }
            ],
            "dates": { "start": { "localDate": "2024-11-24", "localTime": "19:00:00" } },
            "classifications": [{ "segment": { "name": "Sports" } }],
            "_embedded": { "venues": [{ "name": "United Center" }] },
            "priceRanges": [{ "min": 45.0, "max": 250.0 }]
        }));

        let canonical = CanonicalEvent::try_from(event).unwrap();
        assert_eq!(canonical.id, "vv1A");
        assert_eq!(canonical.date, "Nov 24, 2024 · 7:00 PM");
        assert_eq!(canonical.time, "7:00 PM");
        assert!(!canonical.time_tbd);
        assert_eq!(
            canonical.starts_at,
            NaiveDate::from_ymd_opt(2024, 11, 24)
                .unwrap()
                .and_hms_opt(19, 0, 0)
                .unwrap()
        );
        assert_eq!(canonical.venue, "United Center");
        assert_eq!(canonical.price, Some("From $45".to_string()));
        assert_eq!(canonical.image, "https://img/large.jpg");
        assert_eq!(canonical.category, Category::Sports);
        assert_eq!(canonical.description, None);
    }

    #[test]
    fn test_normalize_sparse_record() {
        let event = raw_event(serde_json::json!({
            "id": "g5v",
            "name": "Wilco",
            "dates": { "start": { "localDate": "2025-03-07" } }
        }));

        let canonical = CanonicalEvent::try_from(event).unwrap();
        assert_eq!(canonical.date, "Mar 7, 2025 · TBD");
        assert_eq!(canonical.time, "TBD");
        assert!(canonical.time_tbd);
        assert_eq!(canonical.starts_at.time(), NaiveTime::MIN);
        assert_eq!(canonical.venue, VENUE_TBD);
        assert_eq!(canonical.price, None);
        assert_eq!(canonical.image, "");
        assert_eq!(canonical.category, Category::Music);
    }

    #[test]
    fn test_fractional_price_keeps_decimals() {
        let event = raw_event(serde_json::json!({
            "id": "p1",
            "name": "Spoon",
            "dates": { "start": { "localDate": "2025-03-07", "localTime": "20:30:00" } },
            "priceRanges": [{ "min": 39.5 }]
        }));

        let canonical = CanonicalEvent::try_from(event).unwrap();
        assert_eq!(canonical.price, Some("From $39.5".to_string()));
        assert_eq!(canonical.time, "8:30 PM");
    }

    #[test]
    fn test_widest_image_keeps_first_on_tie() {
        let event = raw_event(serde_json::json!({
            "id": "tie",
            "name": "Tie",
            "images": [
                { "url": "first", "width": 1024 },
                { "url": "second", "width": 1024 }
            ],
            "dates": { "start": { "localDate": "2025-03-07" } }
        }));

        assert_eq!(CanonicalEvent::try_from(event).unwrap().image, "first");
    }

    #[test]
    fn test_normalize_rejects_bad_dates() {
        let missing = raw_event(serde_json::json!({
            "id": "x",
            "name": "No date",
            "dates": { "start": {} }
        }));
        assert!(matches!(
            CanonicalEvent::try_from(missing),
            Err(NormalizeError::MissingDate(_))
        ));

        let invalid = raw_event(serde_json::json!({
            "id": "y",
            "name": "Bad date",
            "dates": { "start": { "localDate": "TBA" } }
        }));
        assert!(matches!(
            CanonicalEvent::try_from(invalid),
            Err(NormalizeError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_parse_display_date() {
        assert_eq!(
            parse_display_date("Oct 22, 2025 · 7:00 PM"),
            NaiveDate::from_ymd_opt(2025, 10, 22)
        );
        assert_eq!(
            parse_display_date("Nov 4, 2024"),
            NaiveDate::from_ymd_opt(2024, 11, 4)
        );
        assert_eq!(parse_display_date("Date TBA · TBD"), None);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Category::Sports).unwrap(), r#""sports""#);
        assert_eq!("Music".parse::<Category>().unwrap(), Category::Music);
        assert!("theatre".parse::<Category>().is_err());
    }
}
