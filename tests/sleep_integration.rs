// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sleep aggregation against a mocked Google Fit API.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Tz;
use daybreak::db::MemoryDb;
use daybreak::models::Provider;
use daybreak::services::{Feed, FeedStatus, GoogleFitSleepSource};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{body_json, config_for, create_test_app, create_test_jwt, session_for};

const SESSIONS_PATH: &str = "/fitness/v1/users/me/sessions";

fn millis(dt: chrono::DateTime<Utc>) -> String {
    dt.timestamp_millis().to_string()
}

#[tokio::test]
async fn test_no_sessions_is_connected_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SESSIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "session": [
                // A walk, not sleep.
                { "activityType": 7, "startTimeMillis": "1709852400000", "endTimeMillis": "1709856000000" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let db = MemoryDb::new();
    let session = session_for(&db, "user-1", &format!("{}/functions/v1", server.uri()));
    session
        .store()
        .save_token(Provider::Google, common::GOOGLE_ACCESS_TOKEN, None, None)
        .await;

    let feed = Feed::new(GoogleFitSleepSource::new(
        reqwest::Client::new(),
        server.uri(),
        session,
        Tz::UTC,
        8.0,
    ));
    let state = feed.refresh().await;

    assert_eq!(state.status, FeedStatus::ConnectedEmpty);
    assert!(state.connected);
    assert!(state.error.is_none());
    assert_eq!(
        state.notice.as_deref(),
        Some("No sleep data found in the last 7 days")
    );
}

#[tokio::test]
async fn test_sleep_route_reports_last_night_and_balance() {
    let server = MockServer::start().await;

    let today = Utc::now().date_naive();
    let wake = Utc.from_utc_datetime(&today.and_hms_opt(6, 30, 0).unwrap());
    let bed = wake - Duration::hours(7);
    let earlier_wake = wake - Duration::days(1);
    let earlier_bed = earlier_wake - Duration::hours(8) - Duration::minutes(30);

    Mock::given(method("GET"))
        .and(path(SESSIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "session": [
                {
                    "activityType": 72,
                    "startTimeMillis": millis(earlier_bed),
                    "endTimeMillis": millis(earlier_wake)
                },
                {
                    "activityType": 72,
                    "startTimeMillis": bed.timestamp_millis(),
                    "endTimeMillis": wake.timestamp_millis()
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, state, _) = create_test_app(config_for(&server.uri()));
    common::seed_token(
        &state,
        "user-1",
        Provider::Google,
        common::GOOGLE_ACCESS_TOKEN,
        None,
        None,
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/sleep?tz=UTC&date={}", today.format("%Y-%m-%d")))
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", create_test_jwt("user-1")),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["feed"]["status"], "connected_with_data");
    assert_eq!(body["last_night"]["wake_hour"], 6.5);
    assert_eq!(body["last_night"]["bed_hour"], 23.5);
    assert_eq!(body["day"]["hours"], 7.0);
    assert_eq!(body["balance"]["type"], "debt");
    assert_eq!(body["balance"]["days_count"], 2);
    assert_eq!(body["balance"]["hours"], 0.5);
}

#[tokio::test]
async fn test_sleep_route_rejects_bad_date() {
    let (app, _, _) = create_test_app(daybreak::config::Config::test_default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sleep?date=yesterday")
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", create_test_jwt("user-1")),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
