// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Everything the dashboard page shows for one user, kept fresh by a
//! background poller while any provider is connected.

use crate::models::{CalendarEvent, SleepDebtOrCapital, SleepSession};
use crate::services::calendar::{GoogleCalendarSource, MicrosoftCalendarSource};
use crate::services::circadian::{circadian_gradient, CircadianGradient};
use crate::services::connections::{check_connections, ProviderConnections};
use crate::services::feed::{Feed, FeedState};
use crate::services::sleep::{GoogleFitSleepSource, SleepHistory};
use crate::services::token_store::TokenStore;
use crate::time_utils::decimal_hour;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default background refresh period.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Point-in-time view of the whole dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub connections: ProviderConnections,
    pub redirect_home: bool,
    pub google_calendar: FeedState<Vec<CalendarEvent>>,
    pub microsoft_calendar: FeedState<Vec<CalendarEvent>>,
    /// Events from every connected calendar, by start time.
    pub events: Vec<CalendarEvent>,
    pub sleep: FeedState<SleepHistory>,
    pub last_night: Option<SleepSession>,
    pub balance: Option<SleepDebtOrCapital>,
    pub gradient: Option<CircadianGradient>,
    pub generated_at: DateTime<Utc>,
}

pub struct Dashboard {
    store: Arc<TokenStore>,
    google_calendar: Feed<GoogleCalendarSource>,
    microsoft_calendar: Feed<MicrosoftCalendarSource>,
    sleep: Feed<GoogleFitSleepSource>,
    tz: Tz,
    snapshots: watch::Sender<DashboardSnapshot>,
}

impl Dashboard {
    pub fn new(
        store: Arc<TokenStore>,
        google_calendar: GoogleCalendarSource,
        microsoft_calendar: MicrosoftCalendarSource,
        sleep: GoogleFitSleepSource,
        tz: Tz,
    ) -> Self {
        let google_calendar = Feed::new(google_calendar);
        let microsoft_calendar = Feed::new(microsoft_calendar);
        let sleep = Feed::new(sleep);

        let initial = build_snapshot(
            ProviderConnections::default(),
            google_calendar.snapshot(),
            microsoft_calendar.snapshot(),
            sleep.snapshot(),
            tz,
            Utc::now(),
        );
        let (snapshots, _) = watch::channel(initial);

        Self {
            store,
            google_calendar,
            microsoft_calendar,
            sleep,
            tz,
            snapshots,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Re-check connections and refresh every feed.
    pub async fn refresh(&self) -> DashboardSnapshot {
        let connections = check_connections(&self.store).await;
        self.refresh_feeds(connections).await
    }

    /// One polling tick. Feeds are only refreshed while something is
    /// connected. Returns whether a refresh ran.
    pub async fn poll_once(&self) -> bool {
        let connections = check_connections(&self.store).await;
        if !connections.any_connected() {
            tracing::debug!(user_id = %self.store.user_id(), "No providers connected, skipping poll");
            return false;
        }

        self.refresh_feeds(connections).await;
        true
    }

    async fn refresh_feeds(&self, connections: ProviderConnections) -> DashboardSnapshot {
        let (google_calendar, microsoft_calendar, sleep) = tokio::join!(
            self.google_calendar.refresh(),
            self.microsoft_calendar.refresh(),
            self.sleep.refresh(),
        );

        let snapshot = build_snapshot(
            connections,
            google_calendar,
            microsoft_calendar,
            sleep,
            self.tz,
            Utc::now(),
        );
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    /// Start the background poller. The first tick is skipped since callers
    /// refresh on open; missed ticks are delayed rather than bursted.
    pub fn start_polling(self: &Arc<Self>, period: Duration) -> PollerHandle {
        let dashboard = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                dashboard.poll_once().await;
            }
        });

        PollerHandle { task }
    }
}

/// Owns the polling task; dropping it stops polling.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn build_snapshot(
    connections: ProviderConnections,
    google_calendar: FeedState<Vec<CalendarEvent>>,
    microsoft_calendar: FeedState<Vec<CalendarEvent>>,
    sleep: FeedState<SleepHistory>,
    tz: Tz,
    now: DateTime<Utc>,
) -> DashboardSnapshot {
    let mut events: Vec<CalendarEvent> = google_calendar
        .data
        .iter()
        .chain(microsoft_calendar.data.iter())
        .flatten()
        .cloned()
        .collect();
    events.sort_by_key(|e| e.starts_at);

    let history = sleep.data.as_ref();
    let last_night = history.and_then(|h| h.last_night()).cloned();
    let balance =
        history.and_then(|h| h.debt_or_capital_for_date(now.with_timezone(&tz).date_naive()));
    let gradient = last_night.as_ref().map(|night| {
        circadian_gradient(
            decimal_hour(now, tz),
            night.wake_hour,
            night.bed_hour,
            balance.as_ref(),
        )
    });

    DashboardSnapshot {
        redirect_home: connections.redirect_home(),
        connections,
        google_calendar,
        microsoft_calendar,
        events,
        sleep,
        last_night,
        balance,
        gradient,
        generated_at: now,
    }
}
