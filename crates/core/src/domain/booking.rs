use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A reserved calendar interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Slot {
    /// Human-readable start time for confirmation messages,
    /// e.g. "Friday, August 14 at 10:00".
    pub fn human_start(&self) -> String {
        self.start.format("%A, %B %-d at %H:%M").to_string()
    }
}

/// An existing calendar event overlapping a queried window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Outcome of a reservation attempt. `Unavailable` covers both a busy window
/// and a provider failure - losing the race for a day is a normal business
/// outcome, not a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reservation {
    Booked(Slot),
    Unavailable,
}

/// Resolve a directive day token against `today`. Recognizes `today`,
/// `tomorrow`, and English weekday names (next strictly-future occurrence).
/// Anything else falls back to tomorrow, which is what the upstream dialogue
/// historically booked.
pub fn resolve_day_token(token: &str, today: NaiveDate) -> NaiveDate {
    let normalized = token.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "today" => today,
        "tomorrow" => today + Duration::days(1),
        other => match parse_weekday(other) {
            Some(weekday) => next_occurrence(today, weekday),
            None => today + Duration::days(1),
        },
    }
}

fn parse_weekday(raw: &str) -> Option<Weekday> {
    match raw {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn next_occurrence(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let mut ahead = (target - current).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    today + Duration::days(ahead)
}
