// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daybreak: a personal day-at-a-glance dashboard backend
//!
//! This crate aggregates calendar and sleep data from OAuth-connected
//! providers and computes the sun and circadian timings the dashboard's
//! time-of-day dial is drawn from.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use chrono_tz::Tz;
use config::Config;
use db::TokenRepository;
use middleware::auth::AuthUser;
use services::{
    Dashboard, GoogleCalendarSource, GoogleFitSleepSource, MicrosoftCalendarSource,
    ProviderSession, RefreshCoordinator, RefreshProxyClient, SessionGroupCache, SunClient,
    TokenStore,
};
use std::sync::Arc;
use std::time::Duration;

/// Timeout for every outbound provider call.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub repo: Arc<dyn TokenRepository>,
    pub session_groups: SessionGroupCache,
    pub refresher: RefreshCoordinator,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, repo: Arc<dyn TokenRepository>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        let refresher = RefreshCoordinator::new(RefreshProxyClient::new(
            http.clone(),
            config.functions_url.clone(),
        ));

        Ok(Self {
            config,
            repo,
            session_groups: SessionGroupCache::new(),
            refresher,
            http,
        })
    }

    /// Token store scoped to the authenticated user.
    pub fn token_store(&self, user: &AuthUser) -> Arc<TokenStore> {
        Arc::new(TokenStore::new(
            self.repo.clone(),
            self.session_groups.clone(),
            user.user_id.clone(),
            user.session_group_hint.clone(),
        ))
    }

    pub fn provider_session(&self, user: &AuthUser, store: Arc<TokenStore>) -> ProviderSession {
        ProviderSession::new(store, self.refresher.clone(), user.session_token.as_str())
    }

    pub fn google_calendar(&self, session: ProviderSession, tz: Tz) -> GoogleCalendarSource {
        GoogleCalendarSource::new(
            self.http.clone(),
            self.config.google_api_url.clone(),
            session,
            tz,
        )
    }

    pub fn microsoft_calendar(&self, session: ProviderSession, tz: Tz) -> MicrosoftCalendarSource {
        MicrosoftCalendarSource::new(
            self.http.clone(),
            self.config.graph_api_url.clone(),
            session,
            tz,
        )
    }

    pub fn sleep_source(&self, session: ProviderSession, tz: Tz) -> GoogleFitSleepSource {
        GoogleFitSleepSource::new(
            self.http.clone(),
            self.config.fit_api_url.clone(),
            session,
            tz,
            self.config.sleep_target_hours,
        )
    }

    pub fn sun_client(&self) -> SunClient {
        SunClient::new(self.http.clone(), self.config.sun_api_url.clone())
    }

    /// A dashboard over every feed for `user`, sharing one token store.
    pub fn dashboard(&self, user: &AuthUser, tz: Tz) -> Dashboard {
        let store = self.token_store(user);
        let session = self.provider_session(user, store.clone());

        Dashboard::new(
            store,
            self.google_calendar(session.clone(), tz),
            self.microsoft_calendar(session.clone(), tz),
            self.sleep_source(session, tz),
            tz,
        )
    }
}
