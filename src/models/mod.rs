mod artist;
mod event;
mod preference;
mod ticketmaster;
mod user;

pub use artist::{
    Artist, SpotifyArtist, SpotifyImage, SpotifyPage, SpotifySearchResponse,
    SpotifyTokenResponse,
};
pub use event::{
    format_display_date, format_display_time, parse_display_date, CanonicalEvent, Category,
    NormalizeError, DATE_TIME_SEPARATOR, TIME_TBD, VENUE_TBD,
};
pub use preference::{NewPreference, Preference, PreferenceItem, PreferenceKind, PreferenceSet};
pub use ticketmaster::{
    TicketmasterClassification, TicketmasterDates, TicketmasterEmbedded, TicketmasterEvent,
    TicketmasterEventEmbedded, TicketmasterImage, TicketmasterNamed, TicketmasterPriceRange,
    TicketmasterResponse, TicketmasterStart,
};
pub use user::{User, UserProfile};
