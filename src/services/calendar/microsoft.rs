// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Microsoft Graph (Outlook) calendar aggregator.

use super::{normalize_event, CalendarWindow, EventParts, EventTime, MAX_EVENTS};
use crate::error::FeedError;
use crate::models::{CalendarEvent, Provider};
use crate::services::authorized::{ApiFailure, ProviderSession};
use crate::services::feed::FeedSource;
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

const OUTLOOK_TIMEZONE_HEADER: &str = r#"outlook.timezone="UTC""#;
const SELECT_FIELDS: &str = "subject,organizer,start,end,location,webLink,isAllDay,onlineMeeting";

#[derive(Debug, Deserialize)]
struct GraphEventsResponse {
    #[serde(default)]
    value: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    subject: Option<String>,
    location: Option<GraphLocation>,
    organizer: Option<GraphRecipient>,
    start: Option<GraphDateTime>,
    end: Option<GraphDateTime>,
    web_link: Option<String>,
    #[serde(default)]
    is_all_day: bool,
    online_meeting: Option<GraphOnlineMeeting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphLocation {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecipient {
    email_address: Option<GraphEmailAddress>,
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    name: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphOnlineMeeting {
    join_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
    time_zone: Option<String>,
}

impl GraphDateTime {
    /// The wall-clock time as sent, in whatever zone Graph chose.
    fn local(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date_time, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }

    /// Graph returns a naive local time plus a zone name. We ask for UTC, but
    /// honor IANA names if the server ignores the preference.
    fn instant(&self) -> Option<DateTime<Utc>> {
        let naive = self.local()?;

        let zone = self
            .time_zone
            .as_deref()
            .filter(|z| !z.eq_ignore_ascii_case("utc"))
            .and_then(|z| z.parse::<Tz>().ok());

        match zone {
            Some(tz) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            None => Some(Utc.from_utc_datetime(&naive)),
        }
    }
}

/// Upcoming events from the user's Outlook calendar view.
#[derive(Clone)]
pub struct MicrosoftCalendarSource {
    http: reqwest::Client,
    base_url: String,
    session: ProviderSession,
    tz: Tz,
}

impl MicrosoftCalendarSource {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: ProviderSession,
        tz: Tz,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session,
            tz,
        }
    }

    async fn list_events(
        &self,
        access_token: &str,
        window: CalendarWindow,
    ) -> Result<Vec<serde_json::Value>, ApiFailure> {
        let url = format!("{}/v1.0/me/calendarview", self.base_url);

        let request = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header("Prefer", OUTLOOK_TIMEZONE_HEADER)
            .query(&[
                ("startDateTime", format_utc_rfc3339(window.start)),
                ("endDateTime", format_utc_rfc3339(window.end)),
                ("$orderby", "start/dateTime".to_string()),
                ("$select", SELECT_FIELDS.to_string()),
                ("$top", MAX_EVENTS.to_string()),
            ]);

        let response: GraphEventsResponse = ApiFailure::send_json(request).await?;
        Ok(response.value)
    }

    /// Normalize raw Graph items, keeping only events starting at or after
    /// `now`. The calendar view also returns events already in progress.
    pub fn normalize(&self, items: Vec<serde_json::Value>, now: DateTime<Utc>) -> Vec<CalendarEvent> {
        items
            .into_iter()
            .filter_map(|raw| {
                let event: GraphEvent = match serde_json::from_value(raw.clone()) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(error = %e, "Skipping unparseable Graph event");
                        return None;
                    }
                };

                let start = event.start.as_ref().and_then(GraphDateTime::instant);
                if start.is_some_and(|start| start < now) {
                    return None;
                }
                let end = event.end.as_ref().and_then(GraphDateTime::instant);

                let (start, end) = if event.is_all_day {
                    // All-day bounds are dates in the event's own zone.
                    let day = |t: &GraphDateTime| t.local().map(|n| EventTime::AllDay(n.date()));
                    (
                        start.and(event.start.as_ref().and_then(day)),
                        end.and(event.end.as_ref().and_then(day)),
                    )
                } else {
                    (start.map(EventTime::At), end.map(EventTime::At))
                };

                let place = event
                    .location
                    .and_then(|l| l.display_name)
                    .filter(|p| !p.trim().is_empty())
                    .or_else(|| {
                        event
                            .organizer
                            .and_then(|o| o.email_address)
                            .and_then(|e| e.name.or(e.address))
                    });

                let parts = EventParts {
                    title: event.subject,
                    place,
                    start,
                    end,
                    url: event
                        .web_link
                        .or(event.online_meeting.and_then(|m| m.join_url)),
                };

                normalize_event(Provider::Microsoft, parts, raw, self.tz)
            })
            .collect()
    }
}

#[async_trait]
impl FeedSource for MicrosoftCalendarSource {
    type Data = Vec<CalendarEvent>;

    fn provider(&self) -> Provider {
        Provider::Microsoft
    }

    async fn fetch(&self) -> Result<Vec<CalendarEvent>, FeedError> {
        let now = Utc::now();
        let window = CalendarWindow::upcoming(now);

        let items = self
            .session
            .fetch_with_retry(Provider::Microsoft, |token| async move {
                self.list_events(&token, window).await
            })
            .await?;

        let events = self.normalize(items, now);
        tracing::debug!(count = events.len(), "Fetched Microsoft calendar events");
        Ok(events)
    }
}
