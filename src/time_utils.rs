// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and local-day projection.

use chrono::{DateTime, NaiveDate, Offset, SecondsFormat, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Local time of day as a decimal hour in [0, 24).
pub fn decimal_hour(instant: DateTime<Utc>, tz: Tz) -> f64 {
    let local = instant.with_timezone(&tz);
    f64::from(local.hour())
        + f64::from(local.minute()) / 60.0
        + f64::from(local.second()) / 3600.0
}

/// Offset from UTC in hours at local noon on `date`.
pub fn utc_offset_hours(tz: Tz, date: NaiveDate) -> f64 {
    let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
    let offset_secs = tz
        .offset_from_local_datetime(&noon)
        .earliest()
        .map(|offset| offset.fix().local_minus_utc())
        .unwrap_or(0);
    f64::from(offset_secs) / 3600.0
}

/// UTC instants bounding local `date` as a half-open range.
pub fn local_day_bounds(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(tz, date);
    let end = date
        .succ_opt()
        .map(|next| local_midnight(tz, next))
        .unwrap_or(start + chrono::Duration::days(1));
    (start, end)
}

fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    // Some zones skip midnight on DST days; fall back to treating it as UTC.
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Parse an IANA zone name, defaulting to UTC when absent.
pub fn parse_tz(name: Option<&str>) -> Result<Tz, String> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        None => Ok(Tz::UTC),
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| format!("Unknown time zone: {}", name)),
    }
}
