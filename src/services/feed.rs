// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reactive state for provider feeds (calendars, sleep).
//!
//! Each feed walks `idle -> loading -> {connected_with_data | connected_empty
//! | disconnected_error | not_connected}` on every refresh and publishes the
//! result on a `watch` channel.

use crate::error::FeedError;
use crate::models::Provider;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Idle,
    Loading,
    ConnectedWithData,
    ConnectedEmpty,
    DisconnectedError,
    NotConnected,
}

/// Data a feed produces, with a notion of "nothing there".
pub trait FeedData {
    fn is_empty(&self) -> bool;
}

impl<T> FeedData for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

/// Snapshot of one feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedState<T> {
    pub provider: Provider,
    pub status: FeedStatus,
    pub data: Option<T>,
    pub loading: bool,
    pub connected: bool,
    /// Short user-facing failure message.
    pub error: Option<String>,
    /// Informational message, e.g. "no sleep data". Not a failure.
    pub notice: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T: FeedData> FeedState<T> {
    pub fn idle(provider: Provider) -> Self {
        Self {
            provider,
            status: FeedStatus::Idle,
            data: None,
            loading: false,
            connected: false,
            error: None,
            notice: None,
            updated_at: None,
        }
    }

    /// Terminal state for a finished fetch cycle.
    pub fn settle(provider: Provider, result: Result<T, FeedError>, now: DateTime<Utc>) -> Self {
        let mut state = Self::idle(provider);
        state.updated_at = Some(now);

        match result {
            Ok(data) => {
                state.connected = true;
                state.status = if data.is_empty() {
                    FeedStatus::ConnectedEmpty
                } else {
                    FeedStatus::ConnectedWithData
                };
                state.data = Some(data);
            }
            // A successful call with nothing to show, not a failure.
            Err(err) if !err.is_connectivity_problem() => {
                state.connected = true;
                state.status = FeedStatus::ConnectedEmpty;
                state.notice = Some(err.to_string());
            }
            Err(err @ (FeedError::NotConnected(_) | FeedError::RefreshFailed(_))) => {
                tracing::debug!(%provider, reason = %err, "Feed not connected");
                state.status = FeedStatus::NotConnected;
                state.error = Some(err.to_string());
            }
            Err(err) => {
                tracing::warn!(%provider, error = %err, "Feed fetch failed");
                state.status = FeedStatus::DisconnectedError;
                state.error = Some(err.to_string());
            }
        }

        state
    }
}

/// Something that can run one fetch cycle for a feed.
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    type Data: FeedData + Clone + Serialize + Send + Sync + 'static;

    fn provider(&self) -> Provider;

    async fn fetch(&self) -> Result<Self::Data, FeedError>;
}

/// A feed source plus its published state.
pub struct Feed<S: FeedSource> {
    source: S,
    state: watch::Sender<FeedState<S::Data>>,
}

impl<S: FeedSource> Feed<S> {
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(FeedState::idle(source.provider()));
        Self { source, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState<S::Data>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FeedState<S::Data> {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    /// Run one fetch cycle and publish its outcome. Previous data stays
    /// visible while loading.
    pub async fn refresh(&self) -> FeedState<S::Data> {
        self.state.send_modify(|state| {
            state.status = FeedStatus::Loading;
            state.loading = true;
        });

        let result = self.source.fetch().await;
        let next = FeedState::settle(self.source.provider(), result, Utc::now());
        self.state.send_replace(next.clone());
        next
    }
}
