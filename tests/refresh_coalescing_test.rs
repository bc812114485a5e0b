// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Concurrent refreshes of the same (session group, provider) share one
//! call to the refresh proxy.

use daybreak::db::MemoryDb;
use daybreak::models::Provider;
use daybreak::services::{RefreshCoordinator, RefreshProxyClient, SessionGroupCache, TokenStore};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refreshes_are_coalesced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/google-token-refresh"))
        .and(body_partial_json(serde_json::json!({ "refresh_token": "1//refresh" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "access_token": "ya29.coalesced",
                    "expires_in": 3600
                }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let db = MemoryDb::new();
    let store = Arc::new(TokenStore::new(
        Arc::new(db.clone()),
        SessionGroupCache::new(),
        "user-1",
        None,
    ));
    store
        .save_token(Provider::Google, "ya29.old", Some("1//refresh"), None)
        .await;

    let coordinator = RefreshCoordinator::new(RefreshProxyClient::new(
        reqwest::Client::new(),
        format!("{}/functions/v1", server.uri()),
    ));

    let calls = (0..5).map(|_| {
        let store = store.clone();
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .refresh(&store, "session-jwt", Provider::Google, "1//refresh", None)
                .await
        })
    });

    for result in futures_util::future::join_all(calls).await {
        assert_eq!(result.unwrap().as_deref(), Some("ya29.coalesced"));
    }

    let stored = store.get_token(Provider::Google).await.unwrap();
    assert_eq!(stored.access_token.as_deref(), Some("ya29.coalesced"));
}

#[tokio::test]
async fn test_sequential_refreshes_are_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/functions/v1/microsoft-token-refresh"))
        .and(body_partial_json(serde_json::json!({
            "scope": "openid profile email offline_access Calendars.Read User.Read"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "eyJ0eXAiOiJKV1QifQ.eyJzdWIiOiJ5In0.c2ln",
            "refresh_token": "M.rotated",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&server)
        .await;

    let db = MemoryDb::new();
    let store = TokenStore::new(Arc::new(db.clone()), SessionGroupCache::new(), "user-1", None);
    store
        .save_token(
            Provider::Microsoft,
            common::MICROSOFT_ACCESS_TOKEN,
            Some("M.original"),
            None,
        )
        .await;

    let coordinator = RefreshCoordinator::new(RefreshProxyClient::new(
        reqwest::Client::new(),
        format!("{}/functions/v1", server.uri()),
    ));

    for _ in 0..2 {
        let token = coordinator
            .refresh(&store, "session-jwt", Provider::Microsoft, "M.original", None)
            .await;
        assert!(token.is_some());
    }

    // Microsoft rotates refresh tokens; the rotated one is kept.
    let stored = store.get_token(Provider::Microsoft).await.unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("M.rotated"));
}
