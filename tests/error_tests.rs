// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use daybreak::error::{AppError, FeedError};
use daybreak::models::Provider;

#[test]
fn test_app_error_status_codes() {
    let cases = [
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
        (AppError::InvalidToken, StatusCode::UNAUTHORIZED),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::Upstream("x".into()), StatusCode::BAD_GATEWAY),
        (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (
            AppError::Internal(anyhow::anyhow!("boom")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, status) in cases {
        assert_eq!(err.into_response().status(), status);
    }
}

#[test]
fn test_no_data_is_not_a_connectivity_problem() {
    let err = FeedError::NoDataFound("No sleep data found in the last 7 days".to_string());
    assert!(!err.is_connectivity_problem());
    assert_eq!(err.to_string(), "No sleep data found in the last 7 days");

    for err in [
        FeedError::NotConnected(Provider::Google),
        FeedError::RefreshFailed(Provider::Microsoft),
        FeedError::UpstreamApi {
            provider: Provider::Google,
            status: 500,
        },
        FeedError::Transport(Provider::Google),
        FeedError::Decode(Provider::Microsoft),
    ] {
        assert!(err.is_connectivity_problem(), "{err}");
    }
}
