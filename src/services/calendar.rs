//! Calendar view model
//!
//! Pure functions that bucket events into day, week and month grids and
//! compute navigation and titles. Weeks start on Sunday.
use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{parse_display_date, CanonicalEvent, Category};

/// Events shown per day in the week view
pub const WEEK_CELL_CAP: usize = 3;

/// Event indicators shown per day in the month view
pub const MONTH_CELL_CAP: usize = 6;

/// Cells in the month grid (5 rows of 7)
pub const MONTH_GRID_CELLS: usize = 35;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Day,
    #[default]
    Week,
    Month,
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(ViewMode::Day),
            "week" => Ok(ViewMode::Week),
            "month" => Ok(ViewMode::Month),
            other => Err(format!("Unknown calendar view '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Subset of an event placed in calendar cells
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub starts_on: NaiveDate,
    pub date: String,
    pub time: String,
    pub venue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl From<&CanonicalEvent> for CalendarEvent {
    fn from(event: &CanonicalEvent) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            starts_on: event.start_date(),
            date: event.date.clone(),
            time: event.time.clone(),
            venue: event.venue.clone(),
            price: event.price.clone(),
            category: event.category,
            logo: Some(event.image.clone()).filter(|image| !image.is_empty()),
        }
    }
}

impl CalendarEvent {
    /// Builds a calendar event from a stored display date such as
    /// "Oct 22, 2025 · 7:00 PM". Unparseable dates yield `None` and the event
    /// never lands in a cell.
    pub fn from_display(event: &CanonicalEvent) -> Option<Self> {
        let starts_on = parse_display_date(&event.date)?;
        Some(Self {
            starts_on,
            ..Self::from(event)
        })
    }
}

/// Current mode and anchor date of a calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarState {
    pub mode: ViewMode,
    pub anchor: NaiveDate,
}

impl CalendarState {
    pub fn new(mode: ViewMode, anchor: NaiveDate) -> Self {
        Self { mode, anchor }
    }

    /// Switches the view, keeping the anchor
    pub fn select_mode(self, mode: ViewMode) -> Self {
        Self { mode, ..self }
    }

    /// Opens the day view on the clicked date
    pub fn click_day(self, date: NaiveDate) -> Self {
        Self {
            mode: ViewMode::Day,
            anchor: date,
        }
    }

    pub fn navigate(self, direction: Direction) -> Self {
        Self {
            anchor: navigate(self.mode, self.anchor, direction),
            ..self
        }
    }

    pub fn title(&self) -> String {
        title(self.mode, self.anchor)
    }
}

/// Shifts the anchor by one day, week or calendar month. Month steps keep the
/// day of month, clamped to the last day of shorter months.
pub fn navigate(mode: ViewMode, anchor: NaiveDate, direction: Direction) -> NaiveDate {
    let shifted = match (mode, direction) {
        (ViewMode::Day, Direction::Prev) => anchor.checked_sub_signed(Duration::days(1)),
        (ViewMode::Day, Direction::Next) => anchor.checked_add_signed(Duration::days(1)),
        (ViewMode::Week, Direction::Prev) => anchor.checked_sub_signed(Duration::days(7)),
        (ViewMode::Week, Direction::Next) => anchor.checked_add_signed(Duration::days(7)),
        (ViewMode::Month, Direction::Prev) => anchor.checked_sub_months(Months::new(1)),
        (ViewMode::Month, Direction::Next) => anchor.checked_add_months(Months::new(1)),
    };
    shifted.unwrap_or(anchor)
}

/// Sunday on or before `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// The seven days of the week containing `anchor`, Sunday first
pub fn week_dates(anchor: NaiveDate) -> Vec<NaiveDate> {
    week_start(anchor).iter_days().take(7).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub date: NaiveDate,
    pub in_current_month: bool,
}

/// Fixed 35-cell grid starting at the Sunday on or before the 1st of the
/// anchor's month
pub fn month_grid(anchor: NaiveDate) -> Vec<GridCell> {
    let first = anchor.with_day(1).unwrap_or(anchor);
    week_start(first)
        .iter_days()
        .take(MONTH_GRID_CELLS)
        .map(|date| GridCell {
            date,
            in_current_month: date.year() == anchor.year() && date.month() == anchor.month(),
        })
        .collect()
}

pub fn events_on(events: &[CalendarEvent], date: NaiveDate) -> Vec<&CalendarEvent> {
    events.iter().filter(|event| event.starts_on == date).collect()
}

pub fn is_today(date: NaiveDate, today: NaiveDate) -> bool {
    date == today
}

/// Week range label: "Nov 24-30, 2024" or "Nov 30 - Dec 6, 2025"
pub fn format_week_range(start: NaiveDate) -> String {
    let end = start + Duration::days(6);
    if start.year() == end.year() && start.month() == end.month() {
        format!("{}-{}, {}", start.format("%b %-d"), end.day(), end.year())
    } else {
        format!("{} - {}, {}", start.format("%b %-d"), end.format("%b %-d"), end.year())
    }
}

pub fn title(mode: ViewMode, anchor: NaiveDate) -> String {
    match mode {
        ViewMode::Day => anchor.format("%a, %B %-d, %Y").to_string(),
        ViewMode::Week => format_week_range(week_start(anchor)),
        ViewMode::Month => anchor.format("%B %Y").to_string(),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day_of_month: u32,
    pub weekday: String,
    pub is_today: bool,
    pub in_current_month: bool,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    pub mode: ViewMode,
    pub anchor: NaiveDate,
    pub title: String,
    pub prev: NaiveDate,
    pub next: NaiveDate,
    pub days: Vec<CalendarDay>,
}

/// Renderable buckets for one calendar screen
pub fn render(
    events: &[CanonicalEvent],
    mode: ViewMode,
    anchor: NaiveDate,
    today: NaiveDate,
) -> CalendarView {
    let events: Vec<CalendarEvent> = events.iter().map(CalendarEvent::from).collect();

    let (cells, cap) = match mode {
        ViewMode::Day => (
            vec![GridCell {
                date: anchor,
                in_current_month: true,
            }],
            usize::MAX,
        ),
        ViewMode::Week => (
            week_dates(anchor)
                .into_iter()
                .map(|date| GridCell {
                    date,
                    in_current_month: date.month() == anchor.month(),
                })
                .collect(),
            WEEK_CELL_CAP,
        ),
        ViewMode::Month => (month_grid(anchor), MONTH_CELL_CAP),
    };

    let days = cells
        .into_iter()
        .map(|cell| CalendarDay {
            date: cell.date,
            day_of_month: cell.date.day(),
            weekday: cell.date.format("%a").to_string(),
            is_today: is_today(cell.date, today),
            in_current_month: cell.in_current_month,
            events: events_on(&events, cell.date)
                .into_iter()
                .take(cap)
                .cloned()
                .collect(),
        })
        .collect();

    CalendarView {
        mode,
        anchor,
        title: title(mode, anchor),
        prev: navigate(mode, anchor, Direction::Prev),
        next: navigate(mode, anchor, Direction::Next),
        days,
    }
}
