// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, SESSION_GROUP_HEADER};
use crate::models::{CalendarEvent, DaySleep, Provider, SleepDebtOrCapital, SleepSession};
use crate::services::circadian::{circadian_gradient, CircadianGradient};
use crate::services::connections::{capture_token, check_connections, CaptureRequest, ProviderConnections};
use crate::services::feed::{Feed, FeedState};
use crate::services::sleep::SleepHistory;
use crate::services::sun::calculate_sun_times_from_base;
use crate::services::token_store::TokenStore;
use crate::time_utils::parse_tz;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderValue,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/connections", get(get_connections))
        .route("/api/tokens", post(post_token))
        .route("/api/tokens/{provider}", delete(delete_token))
        .route("/api/calendar/{provider}", get(get_calendar))
        .route("/api/sleep", get(get_sleep))
        .route("/api/sun", get(get_sun))
        .route("/api/circadian", get(get_circadian))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/dashboard/events", get(dashboard_events))
}

/// JSON response that also hands the client its resolved session group.
fn with_session_group<T: Serialize>(store: &TokenStore, body: T) -> Response {
    let mut response = Json(body).into_response();
    if let Some(value) = store
        .resolved_group_id()
        .and_then(|id| HeaderValue::from_str(id).ok())
    {
        response.headers_mut().insert(SESSION_GROUP_HEADER, value);
    }
    response
}

#[derive(Deserialize)]
struct TzQuery {
    tz: Option<String>,
}

fn tz_param(tz: Option<&str>) -> Result<Tz> {
    parse_tz(tz).map_err(AppError::BadRequest)
}

fn date_param(date: Option<&str>, tz: Tz) -> Result<NaiveDate> {
    match date {
        None => Ok(Utc::now().with_timezone(&tz).date_naive()),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            AppError::BadRequest("Invalid 'date' parameter: must be YYYY-MM-DD".to_string())
        }),
    }
}

fn provider_param(raw: &str) -> Result<Provider> {
    Provider::canonicalize(raw)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown provider: {}", raw)))
}

// ─── Connections & Tokens ────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectionsResponse {
    pub connections: ProviderConnections,
    pub connected: Vec<Provider>,
    pub any_connected: bool,
    pub redirect_home: bool,
}

/// Which providers are connected. Malformed tokens are removed on the way.
async fn get_connections(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    let store = state.token_store(&user);
    let connections = check_connections(&store).await;

    with_session_group(
        &store,
        ConnectionsResponse {
            connected: connections.connected(),
            any_connected: connections.any_connected(),
            redirect_home: connections.redirect_home(),
            connections,
        },
    )
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenResponse {
    pub provider: Provider,
    pub success: bool,
}

/// Store the provider token returned by a completed OAuth redirect.
async fn post_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CaptureRequest>,
) -> Result<Response> {
    let store = state.token_store(&user);
    let provider = capture_token(&store, request).await?;

    Ok(with_session_group(
        &store,
        TokenResponse {
            provider,
            success: true,
        },
    ))
}

/// Disconnect a provider.
async fn delete_token(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(provider): Path<String>,
) -> Result<Response> {
    let provider = provider_param(&provider)?;
    let store = state.token_store(&user);

    let removed = store.remove_token(provider).await;
    tracing::info!(user_id = %user.user_id, %provider, removed, "Provider disconnected");

    Ok(with_session_group(
        &store,
        TokenResponse {
            provider,
            success: removed,
        },
    ))
}

// ─── Calendar & Sleep ────────────────────────────────────────

/// One fetch cycle of a provider's calendar.
async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(provider): Path<String>,
    Query(params): Query<TzQuery>,
) -> Result<Response> {
    let provider = provider_param(&provider)?;
    let tz = tz_param(params.tz.as_deref())?;
    let store = state.token_store(&user);
    let session = state.provider_session(&user, store.clone());

    let feed: FeedState<Vec<CalendarEvent>> = match provider {
        Provider::Google => Feed::new(state.google_calendar(session, tz)).refresh().await,
        Provider::Microsoft => Feed::new(state.microsoft_calendar(session, tz)).refresh().await,
        other => {
            return Err(AppError::BadRequest(format!(
                "{} calendars are not supported",
                other.display_name()
            )))
        }
    };

    Ok(with_session_group(&store, feed))
}

#[derive(Deserialize)]
struct SleepQuery {
    tz: Option<String>,
    /// Local day to report (YYYY-MM-DD); defaults to today.
    date: Option<String>,
}

#[derive(Serialize)]
pub struct SleepResponse {
    pub feed: FeedState<SleepHistory>,
    pub date: NaiveDate,
    pub last_night: Option<SleepSession>,
    pub day: DaySleep,
    pub balance: Option<SleepDebtOrCapital>,
}

async fn get_sleep(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<SleepQuery>,
) -> Result<Response> {
    let tz = tz_param(params.tz.as_deref())?;
    let date = date_param(params.date.as_deref(), tz)?;
    let store = state.token_store(&user);
    let session = state.provider_session(&user, store.clone());

    let feed = Feed::new(state.sleep_source(session, tz)).refresh().await;
    let history = feed.data.as_ref();

    let body = SleepResponse {
        date,
        last_night: history.and_then(|h| h.last_night()).cloned(),
        day: history
            .map(|h| h.sleep_for_date(date))
            .unwrap_or_default(),
        balance: history.and_then(|h| h.debt_or_capital_for_date(date)),
        feed,
    };

    Ok(with_session_group(&store, body))
}

// ─── Sun & Circadian ─────────────────────────────────────────

#[derive(Deserialize)]
struct SunQuery {
    lat: f64,
    lng: f64,
    tz: Option<String>,
    date: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SunResponse {
    pub date: NaiveDate,
    pub sunrise: f64,
    pub sunset: f64,
    /// True when the times were projected from today's measurement.
    pub projected: bool,
}

/// Sunrise/sunset for a location. Days other than today are projected from
/// today's measurement.
async fn get_sun(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SunQuery>,
) -> Result<Json<SunResponse>> {
    if !params.lat.is_finite() || !(-90.0..=90.0).contains(&params.lat) {
        return Err(AppError::BadRequest(
            "Invalid 'lat' parameter: must be within [-90, 90]".to_string(),
        ));
    }
    if !params.lng.is_finite() || !(-180.0..=180.0).contains(&params.lng) {
        return Err(AppError::BadRequest(
            "Invalid 'lng' parameter: must be within [-180, 180]".to_string(),
        ));
    }

    let tz = tz_param(params.tz.as_deref())?;
    let today = Utc::now().with_timezone(&tz).date_naive();
    let date = date_param(params.date.as_deref(), tz)?;

    let measured = state
        .sun_client()
        .sun_times(params.lat, params.lng, today, tz)
        .await?;

    let sun = calculate_sun_times_from_base(
        today,
        date,
        measured.sunrise,
        measured.sunset,
        params.lat,
        tz,
    );

    Ok(Json(SunResponse {
        date,
        sunrise: sun.sunrise,
        sunset: sun.sunset,
        projected: date != today,
    }))
}

#[derive(Deserialize)]
struct CircadianQuery {
    hour: f64,
    wake: f64,
    bed: f64,
    /// Current sleep debt in hours, if known.
    debt: Option<f64>,
}

#[derive(Serialize)]
pub struct CircadianResponse {
    #[serde(flatten)]
    pub gradient: CircadianGradient,
    pub css: String,
}

async fn get_circadian(Query(params): Query<CircadianQuery>) -> Result<Json<CircadianResponse>> {
    for (name, value) in [("hour", params.hour), ("wake", params.wake), ("bed", params.bed)] {
        if !value.is_finite() || !(0.0..=24.0).contains(&value) {
            return Err(AppError::BadRequest(format!(
                "Invalid '{}' parameter: must be within [0, 24]",
                name
            )));
        }
    }

    let balance = match params.debt {
        Some(hours) if !hours.is_finite() || hours < 0.0 => {
            return Err(AppError::BadRequest(
                "Invalid 'debt' parameter: must be a non-negative number".to_string(),
            ))
        }
        Some(hours) => Some(SleepDebtOrCapital {
            kind: crate::models::BalanceKind::Debt,
            hours,
            days_count: 0,
        }),
        None => None,
    };

    let gradient = circadian_gradient(params.hour, params.wake, params.bed, balance.as_ref());
    let css = gradient.css();
    Ok(Json(CircadianResponse { gradient, css }))
}

// ─── Dashboard ───────────────────────────────────────────────

/// One-shot refresh of every feed.
async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<TzQuery>,
) -> Result<Response> {
    let tz = tz_param(params.tz.as_deref())?;
    let dashboard = state.dashboard(&user, tz);
    let snapshot = dashboard.refresh().await;

    Ok(with_session_group(dashboard.store(), snapshot))
}

/// Server-sent dashboard snapshots: one immediately, then one per poll.
///
/// The stream owns the poller, so polling stops when the client goes away.
async fn dashboard_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<TzQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let tz = tz_param(params.tz.as_deref())?;
    let dashboard = Arc::new(state.dashboard(&user, tz));
    let poller = dashboard.start_polling(state.config.poll_interval());
    let updates = dashboard.subscribe();

    tracing::debug!(user_id = %user.user_id, "Dashboard stream opened");

    let events = stream::unfold(
        (dashboard, updates, poller, true),
        |(dashboard, mut updates, poller, first)| async move {
            let snapshot = if first {
                let snapshot = dashboard.refresh().await;
                updates.borrow_and_update();
                snapshot
            } else {
                updates.changed().await.ok()?;
                updates.borrow_and_update().clone()
            };

            let event = Event::default()
                .event("snapshot")
                .json_data(&snapshot)
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Failed to encode dashboard snapshot");
                    Event::default().event("error")
                });

            Some((Ok(event), (dashboard, updates, poller, false)))
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
