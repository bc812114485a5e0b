// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sleep aggregation from Google Fit sessions.
//!
//! Handles:
//! - Fetching a 7-day lookback of Fit sessions and keeping sleep ones
//! - Projecting sessions onto local decimal bed/wake hours
//! - Per-day sleep lookups and the rolling debt/capital balance

use crate::error::FeedError;
use crate::models::{BalanceKind, DaySleep, Provider, SleepDebtOrCapital, SleepSession};
use crate::services::authorized::{ApiFailure, ProviderSession};
use crate::services::feed::{FeedData, FeedSource};
use crate::time_utils::{decimal_hour, format_utc_rfc3339, local_day_bounds};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Google Fit activity type for sleep.
pub const SLEEP_ACTIVITY_TYPE: i64 = 72;

/// How far back sessions are fetched.
pub const SLEEP_LOOKBACK_DAYS: i64 = 7;

/// Days (ending at the requested date) the sleep balance covers.
pub const SLEEP_BALANCE_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
struct FitSessionsResponse {
    #[serde(default)]
    session: Vec<FitSession>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FitSession {
    activity_type: Option<i64>,
    start_time_millis: Option<EpochMillis>,
    end_time_millis: Option<EpochMillis>,
}

/// Fit encodes int64 fields as JSON strings, but numbers show up too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EpochMillis {
    Number(i64),
    Text(String),
}

impl EpochMillis {
    fn instant(&self) -> Option<DateTime<Utc>> {
        let millis = match self {
            EpochMillis::Number(n) => *n,
            EpochMillis::Text(s) => s.trim().parse().ok()?,
        };
        DateTime::from_timestamp_millis(millis)
    }
}

/// Build a session from UTC bounds, projected onto `tz`.
pub fn sleep_session(started_at: DateTime<Utc>, ended_at: DateTime<Utc>, tz: Tz) -> SleepSession {
    SleepSession {
        bed_hour: decimal_hour(started_at, tz),
        wake_hour: decimal_hour(ended_at, tz),
        started_at,
        ended_at,
        duration_hours: (ended_at - started_at).num_seconds() as f64 / 3600.0,
    }
}

/// All sleep sessions in the fetched window, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct SleepHistory {
    pub sessions: Vec<SleepSession>,
    pub target_hours: f64,
    #[serde(skip)]
    tz: Tz,
}

impl FeedData for SleepHistory {
    fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SleepHistory {
    pub fn new(mut sessions: Vec<SleepSession>, tz: Tz, target_hours: f64) -> Self {
        sessions.sort_by_key(|s| s.ended_at);
        Self {
            sessions,
            target_hours,
            tz,
        }
    }

    /// The most recently ended session.
    pub fn last_night(&self) -> Option<&SleepSession> {
        self.sessions.last()
    }

    /// Sleep attributed to local `date`.
    ///
    /// Sessions ending on `date` win; otherwise any session overlapping the
    /// day counts. The longest session supplies bed and wake hours, and
    /// `hours` sums every attributed session.
    pub fn sleep_for_date(&self, date: NaiveDate) -> DaySleep {
        let ended_that_day = self.sessions_ending_on(date);

        let attributed = if ended_that_day.is_empty() {
            let (day_start, day_end) = local_day_bounds(self.tz, date);
            self.sessions
                .iter()
                .filter(|s| s.started_at < day_end && s.ended_at > day_start)
                .collect()
        } else {
            ended_that_day
        };

        let Some(primary) = attributed
            .iter()
            .max_by(|a, b| a.duration_hours.total_cmp(&b.duration_hours))
        else {
            return DaySleep::default();
        };

        DaySleep {
            bed_hour: Some(primary.bed_hour),
            wake_hour: Some(primary.wake_hour),
            hours: Some(attributed.iter().map(|s| s.duration_hours).sum()),
        }
    }

    fn sessions_ending_on(&self, date: NaiveDate) -> Vec<&SleepSession> {
        self.sessions
            .iter()
            .filter(|s| s.ended_at.with_timezone(&self.tz).date_naive() == date)
            .collect()
    }

    /// Rolling balance over the window ending at `date`.
    ///
    /// Each session counts once, on the day it ended. Only days with data
    /// count toward the target. `None` when no day in the window has data.
    pub fn debt_or_capital_for_date(&self, date: NaiveDate) -> Option<SleepDebtOrCapital> {
        let mut actual = 0.0;
        let mut days_count = 0u32;

        for offset in 0..SLEEP_BALANCE_WINDOW_DAYS {
            let Some(day) = date.checked_sub_signed(Duration::days(i64::from(offset))) else {
                break;
            };
            let sessions = self.sessions_ending_on(day);
            if !sessions.is_empty() {
                actual += sessions.iter().map(|s| s.duration_hours).sum::<f64>();
                days_count += 1;
            }
        }

        if days_count == 0 {
            return None;
        }

        let diff = actual - self.target_hours * f64::from(days_count);
        Some(SleepDebtOrCapital {
            kind: if diff >= 0.0 {
                BalanceKind::Capital
            } else {
                BalanceKind::Debt
            },
            hours: diff.abs(),
            days_count,
        })
    }
}

/// Sleep sessions from Google Fit.
#[derive(Clone)]
pub struct GoogleFitSleepSource {
    http: reqwest::Client,
    base_url: String,
    session: ProviderSession,
    tz: Tz,
    target_hours: f64,
}

impl GoogleFitSleepSource {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        session: ProviderSession,
        tz: Tz,
        target_hours: f64,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session,
            tz,
            target_hours,
        }
    }

    async fn list_sessions(
        &self,
        access_token: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<FitSessionsResponse, ApiFailure> {
        let url = format!("{}/fitness/v1/users/me/sessions", self.base_url);

        let request = self.http.get(&url).bearer_auth(access_token).query(&[
            ("startTime", format_utc_rfc3339(start)),
            ("endTime", format_utc_rfc3339(end)),
        ]);

        ApiFailure::send_json(request).await
    }
}

fn sleep_sessions(response: FitSessionsResponse, tz: Tz) -> Vec<SleepSession> {
    response
        .session
        .into_iter()
        .filter(|s| s.activity_type == Some(SLEEP_ACTIVITY_TYPE))
        .filter_map(|s| {
            let started_at = s.start_time_millis.as_ref()?.instant()?;
            let ended_at = s.end_time_millis.as_ref()?.instant()?;
            (ended_at > started_at).then(|| sleep_session(started_at, ended_at, tz))
        })
        .collect()
}

#[async_trait]
impl FeedSource for GoogleFitSleepSource {
    type Data = SleepHistory;

    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn fetch(&self) -> Result<SleepHistory, FeedError> {
        let end = Utc::now();
        let start = end - Duration::days(SLEEP_LOOKBACK_DAYS);

        let response = self
            .session
            .fetch_with_retry(Provider::Google, |token| async move {
                self.list_sessions(&token, start, end).await
            })
            .await?;

        let sessions = sleep_sessions(response, self.tz);
        if sessions.is_empty() {
            return Err(FeedError::NoDataFound(format!(
                "No sleep data found in the last {} days",
                SLEEP_LOOKBACK_DAYS
            )));
        }

        tracing::debug!(count = sessions.len(), "Fetched Google Fit sleep sessions");
        Ok(SleepHistory::new(sessions, self.tz, self.target_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn night(day: u32, hours: i64) -> SleepSession {
        // Bed at 23:00 the evening before `day`.
        let start = at(day, 0, 0) - Duration::hours(1);
        sleep_session(start, start + Duration::hours(hours), Tz::UTC)
    }

    #[test]
    fn test_millis_accepts_strings_and_numbers() {
        let json = r#"{"session":[
            {"activityType":72,"startTimeMillis":"1709852400000","endTimeMillis":1709881200000},
            {"activityType":7,"startTimeMillis":"1709852400000","endTimeMillis":"1709881200000"},
            {"activityType":72,"startTimeMillis":"bogus","endTimeMillis":"1709881200000"}
        ]}"#;
        let response: FitSessionsResponse = serde_json::from_str(json).unwrap();

        let sessions = sleep_sessions(response, Tz::UTC);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].bed_hour, 23.0);
        assert_eq!(sessions[0].wake_hour, 7.0);
        assert_eq!(sessions[0].duration_hours, 8.0);
    }

    #[test]
    fn test_decimal_hours_follow_time_zone() {
        let session = sleep_session(at(8, 6, 30), at(8, 14, 0), chrono_tz::America::Los_Angeles);
        assert_eq!(session.bed_hour, 22.5);
        assert_eq!(session.wake_hour, 6.0);
    }

    #[test]
    fn test_last_night_is_most_recently_ended() {
        let history = SleepHistory::new(vec![night(9, 7), night(7, 8), night(8, 6)], Tz::UTC, 8.0);
        assert_eq!(history.last_night().unwrap().ended_at, night(9, 7).ended_at);
    }

    #[test]
    fn test_sleep_for_date_prefers_longest_and_sums() {
        let nap = sleep_session(at(9, 13, 0), at(9, 14, 0), Tz::UTC);
        let history = SleepHistory::new(vec![night(9, 7), nap], Tz::UTC, 8.0);

        let day = history.sleep_for_date(date(9));
        assert_eq!(day.bed_hour, Some(23.0));
        assert_eq!(day.wake_hour, Some(6.0));
        assert_eq!(day.hours, Some(8.0));
    }

    #[test]
    fn test_sleep_for_date_without_data_is_empty() {
        let history = SleepHistory::new(vec![night(9, 7)], Tz::UTC, 8.0);
        assert_eq!(history.sleep_for_date(date(2)), DaySleep::default());
    }

    #[test]
    fn test_debt_counts_only_days_with_data() {
        let history = SleepHistory::new(vec![night(7, 7), night(9, 6)], Tz::UTC, 8.0);

        let balance = history.debt_or_capital_for_date(date(9)).unwrap();
        assert_eq!(balance.kind, BalanceKind::Debt);
        assert_eq!(balance.days_count, 2);
        assert_eq!(balance.hours, 3.0);
        assert_eq!(balance.debt_hours(), 3.0);
    }

    #[test]
    fn test_exact_target_is_capital() {
        let history = SleepHistory::new(vec![night(9, 8)], Tz::UTC, 8.0);

        let balance = history.debt_or_capital_for_date(date(9)).unwrap();
        assert_eq!(balance.kind, BalanceKind::Capital);
        assert_eq!(balance.hours, 0.0);
        assert!(history.debt_or_capital_for_date(date(1)).is_none());
    }
}
