// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only calendar aggregation for Google and Microsoft.
//!
//! Both providers are queried for the same forward window and normalized into
//! [`CalendarEvent`]s projected onto the caller's local day.

pub mod google;
pub mod microsoft;

pub use google::GoogleCalendarSource;
pub use microsoft::MicrosoftCalendarSource;

use crate::models::{CalendarEvent, Provider};
use crate::time_utils::decimal_hour;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// How far ahead calendars are queried.
pub const CALENDAR_WINDOW_HOURS: i64 = 72;

/// Page size requested from each provider.
pub const MAX_EVENTS: u32 = 50;

/// Half-open query window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarWindow {
    /// `now .. now + 72h`.
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self {
            start: now,
            end: now + Duration::hours(CALENDAR_WINDOW_HOURS),
        }
    }
}

/// A provider's start or end, before projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventTime {
    At(DateTime<Utc>),
    AllDay(NaiveDate),
}

impl EventTime {
    fn instant(self, tz: Tz) -> DateTime<Utc> {
        match self {
            EventTime::At(instant) => instant,
            EventTime::AllDay(date) => {
                let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
                tz.from_local_datetime(&midnight)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
            }
        }
    }
}

/// Provider-independent fields pulled out of one raw event.
pub struct EventParts {
    pub title: Option<String>,
    pub place: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub url: Option<String>,
}

/// Build the normalized event, or `None` if a start or end is missing.
pub fn normalize_event(
    provider: Provider,
    parts: EventParts,
    raw: serde_json::Value,
    tz: Tz,
) -> Option<CalendarEvent> {
    let (start, end) = match (parts.start, parts.end) {
        (Some(start), Some(end)) => (start, end),
        _ => return None,
    };

    let all_day = matches!(start, EventTime::AllDay(_));
    let starts_at = start.instant(tz);
    let ends_at = end.instant(tz);

    let (start_hour, end_hour) = if all_day {
        (0.0, 24.0)
    } else {
        (decimal_hour(starts_at, tz), decimal_hour(ends_at, tz))
    };

    let title = parts
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "(No title)".to_string());

    Some(CalendarEvent {
        provider,
        title,
        place: parts.place.filter(|p| !p.trim().is_empty()),
        start: start_hour,
        end: end_hour,
        all_day,
        starts_at,
        ends_at,
        url: parts.url,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_end_is_dropped() {
        let parts = EventParts {
            title: Some("Standup".to_string()),
            place: None,
            start: Some(EventTime::At(Utc::now())),
            end: None,
            url: None,
        };
        assert!(normalize_event(Provider::Google, parts, serde_json::Value::Null, Tz::UTC).is_none());
    }

    #[test]
    fn test_all_day_spans_whole_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let parts = EventParts {
            title: Some("Holiday".to_string()),
            place: Some("  ".to_string()),
            start: Some(EventTime::AllDay(date)),
            end: Some(EventTime::AllDay(date.succ_opt().unwrap())),
            url: None,
        };
        let event = normalize_event(Provider::Google, parts, serde_json::Value::Null, Tz::UTC)
            .expect("event");
        assert!(event.all_day);
        assert_eq!((event.start, event.end), (0.0, 24.0));
        assert!(event.place.is_none());
    }

    #[test]
    fn test_timed_event_uses_local_hours() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 17, 15, 0).unwrap();
        let parts = EventParts {
            title: None,
            place: None,
            start: Some(EventTime::At(start)),
            end: Some(EventTime::At(start + Duration::minutes(90))),
            url: None,
        };
        let event = normalize_event(
            Provider::Microsoft,
            parts,
            serde_json::Value::Null,
            chrono_tz::America::Los_Angeles,
        )
        .expect("event");
        assert_eq!(event.start, 9.25);
        assert_eq!(event.end, 10.75);
        assert_eq!(event.title, "(No title)");
    }
}
