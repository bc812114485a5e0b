// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar aggregator.

use super::{normalize_event, CalendarWindow, EventParts, EventTime, MAX_EVENTS};
use crate::error::FeedError;
use crate::models::{CalendarEvent, Provider};
use crate::services::authorized::{ApiFailure, ProviderSession};
use crate::services::feed::FeedSource;
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    summary: Option<String>,
    location: Option<String>,
    organizer: Option<GoogleOrganizer>,
    start: Option<GoogleEventTime>,
    end: Option<GoogleEventTime>,
    html_link: Option<String>,
    hangout_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleOrganizer {
    display_name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventTime {
    date_time: Option<DateTime<FixedOffset>>,
    date: Option<NaiveDate>,
}

impl GoogleEventTime {
    fn to_event_time(&self) -> Option<EventTime> {
        self.date_time
            .map(|dt| EventTime::At(dt.with_timezone(&Utc)))
            .or(self.date.map(EventTime::AllDay))
    }
}

/// Upcoming events from the user's primary Google calendar.
#[derive(Clone)]
pub struct GoogleCalendarSource {
    http: reqwest::Client,
    base_url: String,
    session: ProviderSession,
    tz: Tz,
}

impl GoogleCalendarSource {
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
        let url = format!("{}/calendar/v3/calendars/primary/events", self.base_url);

        let request = self.http.get(&url).bearer_auth(access_token).query(&[
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("timeMin", format_utc_rfc3339(window.start)),
            ("timeMax", format_utc_rfc3339(window.end)),
            ("maxResults", MAX_EVENTS.to_string()),
        ]);

        let response: GoogleEventsResponse = ApiFailure::send_json(request).await?;
        Ok(response.items)
    }

    /// Normalize raw Google items, silently dropping incomplete ones.
    pub fn normalize(&self, items: Vec<serde_json::Value>) -> Vec<CalendarEvent> {
        items
            .into_iter()
            .filter_map(|raw| {
                let event: GoogleEvent = match serde_json::from_value(raw.clone()) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(error = %e, "Skipping unparseable Google event");
                        return None;
                    }
                };

                let place = event.location.clone().or_else(|| {
                    event
                        .organizer
                        .as_ref()
                        .and_then(|o| o.display_name.clone().or_else(|| o.email.clone()))
                });

                let parts = EventParts {
                    title: event.summary,
                    place,
                    start: event.start.as_ref().and_then(GoogleEventTime::to_event_time),
                    end: event.end.as_ref().and_then(GoogleEventTime::to_event_time),
                    url: event.html_link.or(event.hangout_link),
                };

                normalize_event(Provider::Google, parts, raw, self.tz)
            })
            .collect()
    }
}

#[async_trait]
impl FeedSource for GoogleCalendarSource {
    type Data = Vec<CalendarEvent>;

    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn fetch(&self) -> Result<Vec<CalendarEvent>, FeedError> {
        let window = CalendarWindow::upcoming(Utc::now());

        let items = self
            .session
            .fetch_with_retry(Provider::Google, |token| async move {
                self.list_events(&token, window).await
            })
            .await?;

        let events = self.normalize(items);
        tracing::debug!(count = events.len(), "Fetched Google calendar events");
        Ok(events)
    }
}
