// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, Utc};
use daybreak::config::Config;
use daybreak::db::{FirestoreDb, MemoryDb};
use daybreak::middleware::auth::create_jwt;
use daybreak::models::Provider;
use daybreak::routes::create_router;
use daybreak::services::{
    ProviderSession, RefreshCoordinator, RefreshProxyClient, SessionGroupCache, TokenStore,
};
use daybreak::AppState;
use std::sync::Arc;

/// A Google access token that passes validation.
#[allow(dead_code)]
pub const GOOGLE_ACCESS_TOKEN: &str = "ya29.a0AfH6SMB-test-access-token";

/// A Microsoft access token that passes validation (three JWT segments).
#[allow(dead_code)]
pub const MICROSOFT_ACCESS_TOKEN: &str = "eyJ0eXAiOiJKV1QifQ.eyJzdWIiOiJ4In0.c2ln";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Config with every upstream pointed at `base_url` (usually a wiremock
/// server). The refresh proxy lives under `/functions/v1`.
#[allow(dead_code)]
pub fn config_for(base_url: &str) -> Config {
    Config {
        functions_url: format!("{}/functions/v1", base_url),
        google_api_url: base_url.to_string(),
        fit_api_url: base_url.to_string(),
        graph_api_url: base_url.to_string(),
        sun_api_url: base_url.to_string(),
        ..Config::test_default()
    }
}

/// Create a test app backed by the in-memory repository.
/// Returns the router, the shared state, and the repository.
#[allow(dead_code)]
pub fn create_test_app(config: Config) -> (axum::Router, Arc<AppState>, MemoryDb) {
    let db = MemoryDb::new();
    let state = Arc::new(AppState::new(config, Arc::new(db.clone())).unwrap());
    (create_router(state.clone()), state, db)
}

/// Create a session JWT signed with the test config's secret.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str) -> String {
    create_jwt(user_id, &Config::test_default().session_jwt_secret).unwrap()
}

/// A token store and provider session for `user_id` against `db`.
#[allow(dead_code)]
pub fn session_for(db: &MemoryDb, user_id: &str, functions_url: &str) -> ProviderSession {
    let store = Arc::new(TokenStore::new(
        Arc::new(db.clone()),
        SessionGroupCache::new(),
        user_id,
        None,
    ));
    let client = RefreshProxyClient::new(reqwest::Client::new(), functions_url);
    ProviderSession::new(store, RefreshCoordinator::new(client), "session-jwt")
}

/// Seed a token directly through a fresh store for `user_id`.
#[allow(dead_code)]
pub async fn seed_token(
    state: &AppState,
    user_id: &str,
    provider: Provider,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) {
    let store = TokenStore::new(
        state.repo.clone(),
        state.session_groups.clone(),
        user_id,
        None,
    );
    assert!(
        store
            .save_token(provider, access_token, refresh_token, expires_at)
            .await
    );
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
