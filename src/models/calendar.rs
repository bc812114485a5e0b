// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalized calendar event shared by every calendar provider.

use crate::models::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A calendar event projected onto the local day.
///
/// `start` and `end` are decimal hours of the local day (13.5 = 13:30).
/// Consumers that need multi-day precision must use `starts_at`/`ends_at`
/// or the untouched provider payload in `raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CalendarEvent {
    pub provider: Provider,
    pub title: String,
    /// Best-effort location or organizer.
    pub place: Option<String>,
    pub start: f64,
    pub end: f64,
    pub all_day: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Deep link into the provider's calendar UI.
    pub url: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub raw: serde_json::Value,
}
