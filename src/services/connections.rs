// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Which providers the user has connected, and intake of new tokens.

use crate::error::AppError;
use crate::models::Provider;
use crate::services::provider_detect::classify_token;
use crate::services::token_store::TokenStore;
use crate::services::token_validator::is_token_valid;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-provider connection flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProviderConnections {
    pub google: bool,
    pub microsoft: bool,
    pub apple: bool,
    pub facebook: bool,
    pub amazon: bool,
}

impl ProviderConnections {
    pub fn is_connected(&self, provider: Provider) -> bool {
        match provider {
            Provider::Google => self.google,
            Provider::Microsoft => self.microsoft,
            Provider::Apple => self.apple,
            Provider::Facebook => self.facebook,
            Provider::Amazon => self.amazon,
        }
    }

    fn set(&mut self, provider: Provider, connected: bool) {
        let flag = match provider {
            Provider::Google => &mut self.google,
            Provider::Microsoft => &mut self.microsoft,
            Provider::Apple => &mut self.apple,
            Provider::Facebook => &mut self.facebook,
            Provider::Amazon => &mut self.amazon,
        };
        *flag = connected;
    }

    pub fn connected(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.is_connected(*p))
            .collect()
    }

    pub fn any_connected(&self) -> bool {
        Provider::ALL.iter().any(|p| self.is_connected(*p))
    }

    /// Send the user back to the landing page when nothing is connected.
    pub fn redirect_home(&self) -> bool {
        !self.any_connected()
    }
}

/// Build the connection flags from stored tokens.
///
/// A stored access token that fails validation, or a record with no tokens
/// at all, is deleted and the provider counts as disconnected. A record with
/// only a refresh token still counts as connected.
pub async fn check_connections(store: &TokenStore) -> ProviderConnections {
    let mut connections = ProviderConnections::default();

    for token in store.get_all_tokens().await {
        let access = token.access_token.as_deref().filter(|t| !t.is_empty());
        let refresh = token.refresh_token.as_deref().filter(|t| !t.is_empty());

        let connected = match (access, refresh) {
            (Some(access), _) => is_token_valid(access, token.provider),
            (None, Some(_)) => true,
            (None, None) => false,
        };

        if !connected {
            tracing::info!(provider = %token.provider, "Removing malformed token");
            store.remove_token(token.provider).await;
        }

        connections.set(token.provider, connected);
    }

    connections
}

/// Token handed back by the identity broker after an OAuth redirect.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CaptureRequest {
    pub provider_token: String,
    #[serde(default)]
    pub provider_refresh_token: Option<String>,
    /// Seconds until the access token expires.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// The broker's own provider label, e.g. "azure".
    #[serde(default)]
    pub provider: Option<String>,
    /// Decoded ID token claims, if the broker exposes them.
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub claims: Option<serde_json::Value>,
}

/// Classify, validate, and persist a freshly returned provider token.
pub async fn capture_token(store: &TokenStore, request: CaptureRequest) -> Result<Provider, AppError> {
    let token = request.provider_token.trim();

    let provider = classify_token(token, request.claims.as_ref(), request.provider.as_deref())
        .ok_or_else(|| AppError::BadRequest("Could not determine token provider".to_string()))?;

    if !is_token_valid(token, provider) {
        tracing::warn!(%provider, "Rejected malformed provider token");
        return Err(AppError::BadRequest(format!(
            "Malformed {} token",
            provider.display_name()
        )));
    }

    let expires_at = request
        .expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| Utc::now() + Duration::seconds(secs));
    let supplied = request
        .provider_refresh_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);

    // Re-consent often omits the refresh token; keep the one we have.
    let refresh_token = match supplied {
        Some(token) => Some(token),
        None => store
            .get_token(provider)
            .await
            .and_then(|existing| existing.refresh_token),
    };

    if !store
        .save_token(provider, token, refresh_token.as_deref(), expires_at)
        .await
    {
        return Err(AppError::Database("Failed to save token".to_string()));
    }

    tracing::info!(%provider, has_refresh = refresh_token.is_some(), "Captured provider token");
    Ok(provider)
}
