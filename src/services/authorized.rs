// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token acquisition and the bounded refresh-and-retry wrapper shared by
//! every provider aggregator.

use crate::error::FeedError;
use crate::models::Provider;
use crate::services::refresh::RefreshCoordinator;
use crate::services::token_store::TokenStore;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;

/// A fetch cycle makes at most this many upstream attempts: the first, plus
/// one retry after refreshing on 401.
pub const MAX_FETCH_ATTEMPTS: u32 = 2;

/// How an upstream provider call failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFailure {
    Unauthorized,
    Status(u16),
    Transport(String),
    Decode(String),
}

impl ApiFailure {
    /// Classify a response; `Ok` hands the response back for decoding.
    pub async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiFailure> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = %status, body = %body, "Provider API returned an error");

        if status.as_u16() == 401 {
            return Err(ApiFailure::Unauthorized);
        }
        Err(ApiFailure::Status(status.as_u16()))
    }

    /// Send a prepared request and decode its JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiFailure> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ApiFailure::Decode(e.to_string()))
    }

    fn into_feed_error(self, provider: Provider) -> FeedError {
        match self {
            ApiFailure::Unauthorized => FeedError::UpstreamApi {
                provider,
                status: 401,
            },
            ApiFailure::Status(status) => FeedError::UpstreamApi { provider, status },
            ApiFailure::Transport(msg) => {
                tracing::warn!(error = %msg, %provider, "Provider API unreachable");
                FeedError::Transport(provider)
            }
            ApiFailure::Decode(msg) => {
                tracing::warn!(error = %msg, %provider, "Provider API response did not parse");
                FeedError::Decode(provider)
            }
        }
    }
}

/// Everything an aggregator needs to act on behalf of one signed-in user.
#[derive(Clone)]
pub struct ProviderSession {
    store: Arc<TokenStore>,
    refresher: RefreshCoordinator,
    session_token: Arc<str>,
}

impl ProviderSession {
    pub fn new(
        store: Arc<TokenStore>,
        refresher: RefreshCoordinator,
        session_token: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            store,
            refresher,
            session_token: session_token.into(),
        }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    async fn refresh(&self, provider: Provider, refresh_token: &str) -> Option<String> {
        self.refresher
            .refresh(&self.store, &self.session_token, provider, refresh_token, None)
            .await
    }

    /// Run `fetch` with a valid access token for `provider`.
    ///
    /// 1. Use the stored access token; if there is none but a refresh token
    ///    exists, refresh before the first attempt.
    /// 2. On 401, refresh once and retry, unless this cycle already refreshed.
    /// 3. Any other failure ends the cycle.
    ///
    /// The refresh proxy is called at most once per cycle.
    pub async fn fetch_with_retry<T, F, Fut>(
        &self,
        provider: Provider,
        mut fetch: F,
    ) -> Result<T, FeedError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, ApiFailure>>,
    {
        let stored = self.store.get_token(provider).await;
        let refresh_token = stored
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .filter(|t| !t.is_empty());
        let mut access_token = stored
            .as_ref()
            .and_then(|t| t.usable_access_token(Utc::now()))
            .map(String::from);

        let mut refreshed = false;
        if access_token.is_none() {
            if let Some(refresh_token) = refresh_token.as_deref() {
                refreshed = true;
                access_token = self.refresh(provider, refresh_token).await;
                if access_token.is_none() {
                    return Err(FeedError::RefreshFailed(provider));
                }
            }
        }

        let Some(mut access_token) = access_token else {
            return Err(FeedError::NotConnected(provider));
        };

        let mut attempt = 1;
        loop {
            let failure = match fetch(access_token.clone()).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            let can_retry = failure == ApiFailure::Unauthorized
                && attempt < MAX_FETCH_ATTEMPTS
                && !refreshed;

            let refresh_token = match refresh_token.as_deref() {
                Some(refresh_token) if can_retry => refresh_token,
                _ => return Err(failure.into_feed_error(provider)),
            };

            tracing::info!(%provider, attempt, "Provider rejected access token, refreshing");
            refreshed = true;
            access_token = self
                .refresh(provider, refresh_token)
                .await
                .ok_or(FeedError::RefreshFailed(provider))?;
            attempt += 1;
        }
    }
}
