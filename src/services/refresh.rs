// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token refresh through the backend refresh proxy.
//!
//! Handles:
//! - Calling `{functions_url}/{provider}-token-refresh` with the stored refresh token
//! - Persisting the new access token (and Microsoft's rotated refresh token)
//! - Coalescing concurrent refreshes of the same (session group, provider)

use crate::models::Provider;
use crate::services::token_store::TokenStore;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Expiry assumed when the proxy does not report a usable `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 60 * 60;

/// Scope requested from Microsoft when the caller does not override it.
pub const MICROSOFT_DEFAULT_SCOPE: &str =
    "openid profile email offline_access Calendars.Read User.Read";

/// Scope requested from Google when the caller does not override it.
pub const GOOGLE_DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly \
     https://www.googleapis.com/auth/fitness.sleep.read";

/// Request body accepted by the refresh proxy.
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

/// Successful refresh proxy response.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl RefreshResponse {
    /// Expiry from `expires_in`, or a one-hour estimate if it is missing or
    /// not positive.
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        now + Duration::seconds(secs)
    }
}

/// HTTP client for the backend refresh proxy.
#[derive(Clone)]
pub struct RefreshProxyClient {
    http: reqwest::Client,
    functions_url: String,
}

impl RefreshProxyClient {
    pub fn new(http: reqwest::Client, functions_url: impl Into<String>) -> Self {
        Self {
            http,
            functions_url: functions_url.into(),
        }
    }

    /// Exchange a refresh token. Any failure is logged and returns `None`.
    pub async fn exchange(
        &self,
        provider: Provider,
        session_token: &str,
        refresh_token: &str,
        scope: Option<&str>,
    ) -> Option<RefreshResponse> {
        let url = format!("{}/{}-token-refresh", self.functions_url, provider);

        let response = match self
            .http
            .post(&url)
            .bearer_auth(session_token)
            .json(&RefreshRequest {
                refresh_token,
                scope,
            })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, %provider, "Token refresh request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, %provider, "Token refresh rejected");
            return None;
        }

        match response.json::<RefreshResponse>().await {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(error = %e, %provider, "Failed to parse token refresh response");
                None
            }
        }
    }
}

type InFlightKey = (String, Provider);
type InFlight = Arc<DashMap<InFlightKey, Arc<OnceCell<Option<String>>>>>;

/// Refreshes provider tokens, at most one in flight per (session group, provider).
///
/// The first caller performs the refresh; callers arriving while it is
/// pending wait for and share its result.
#[derive(Clone)]
pub struct RefreshCoordinator {
    client: RefreshProxyClient,
    in_flight: InFlight,
}

impl RefreshCoordinator {
    pub fn new(client: RefreshProxyClient) -> Self {
        Self {
            client,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Providers the refresh proxy knows how to refresh.
    pub fn supports(provider: Provider) -> bool {
        matches!(provider, Provider::Google | Provider::Microsoft)
    }

    /// Refresh `provider`'s access token and persist the result.
    ///
    /// Returns the new access token, or `None` if the refresh failed for any
    /// reason. Surfacing the failure is the caller's job.
    pub async fn refresh(
        &self,
        store: &TokenStore,
        session_token: &str,
        provider: Provider,
        refresh_token: &str,
        scope_override: Option<&str>,
    ) -> Option<String> {
        if !Self::supports(provider) {
            tracing::warn!(%provider, "No refresh proxy for provider");
            return None;
        }

        let Some(session_group_id) = store.session_group_id().await else {
            // Without a group there is nothing to coalesce on or persist to.
            return self
                .refresh_now(store, session_token, provider, refresh_token, scope_override)
                .await;
        };

        let key = (session_group_id, provider);
        let cell = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell
            .get_or_init(|| {
                self.refresh_now(store, session_token, provider, refresh_token, scope_override)
            })
            .await
            .clone();

        self.in_flight
            .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell));

        result
    }

    async fn refresh_now(
        &self,
        store: &TokenStore,
        session_token: &str,
        provider: Provider,
        refresh_token: &str,
        scope_override: Option<&str>,
    ) -> Option<String> {
        let scope = scope_override.or(match provider {
            Provider::Microsoft => Some(MICROSOFT_DEFAULT_SCOPE),
            Provider::Google => Some(GOOGLE_DEFAULT_SCOPE),
            _ => None,
        });

        tracing::info!(%provider, "Refreshing access token");

        let response = self
            .client
            .exchange(provider, session_token, refresh_token, scope)
            .await?;

        let Some(access_token) = response.access_token.clone().filter(|t| !t.is_empty()) else {
            tracing::warn!(%provider, "Token refresh response had no access token");
            return None;
        };

        // Microsoft may rotate the refresh token; otherwise keep the one we have.
        let next_refresh_token = match provider {
            Provider::Microsoft => response
                .refresh_token
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(refresh_token),
            _ => refresh_token,
        };

        let expires_at = response.expires_at(Utc::now());
        if !store
            .save_token(provider, &access_token, Some(next_refresh_token), Some(expires_at))
            .await
        {
            tracing::warn!(%provider, "Refreshed token could not be persisted, using it anyway");
        }

        tracing::info!(%provider, expires_at = %expires_at, "Token refreshed");
        Some(access_token)
    }
}
