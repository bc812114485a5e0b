// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whole-dashboard refresh across providers.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, SecondsFormat, Utc};
use daybreak::models::Provider;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{body_json, config_for, create_test_app, create_test_jwt};

fn rfc3339(offset_hours: i64) -> String {
    (Utc::now() + Duration::hours(offset_hours)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[tokio::test]
async fn test_dashboard_merges_connected_feeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/calendar/v3/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {
                    "summary": "Later",
                    "start": { "dateTime": rfc3339(5) },
                    "end": { "dateTime": rfc3339(6) }
                },
                {
                    "summary": "Sooner",
                    "start": { "dateTime": rfc3339(1) },
                    "end": { "dateTime": rfc3339(2) }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fitness/v1/users/me/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "session": [] })))
        .expect(1)
        .mount(&server)
        .await;

    // Microsoft is not connected, so Graph must not be called.
    Mock::given(method("GET"))
        .and(path("/v1.0/me/calendarview"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
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
                .uri("/api/dashboard?tz=America/New_York")
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
    assert!(response.headers().get("x-session-group").is_some());
    let body = body_json(response).await;

    assert_eq!(body["connections"]["google"], true);
    assert_eq!(body["redirect_home"], false);
    assert_eq!(body["google_calendar"]["status"], "connected_with_data");
    assert_eq!(body["microsoft_calendar"]["status"], "not_connected");
    assert_eq!(body["sleep"]["status"], "connected_empty");
    assert_eq!(body["gradient"], serde_json::Value::Null);

    let titles: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Sooner", "Later"]);
}

#[tokio::test]
async fn test_dashboard_stream_sends_initial_snapshot() {
    use futures_util::StreamExt;

    let (app, _, _) = create_test_app(daybreak::config::Config::test_default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/dashboard/events")
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
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let chunk = body.next().await.unwrap().unwrap();
    let chunk = String::from_utf8(chunk.to_vec()).unwrap();

    assert!(chunk.starts_with("event: snapshot\n"), "{chunk}");
    assert!(chunk.contains("\"redirect_home\":true"), "{chunk}");
}
