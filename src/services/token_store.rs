// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort token store scoped to one user's session group.
//!
//! Every persistence failure is logged and turned into `false`, `None`, or an
//! empty list. Callers treat the store as a cache, never as a transaction.

use crate::db::TokenRepository;
use crate::error::AppError;
use crate::models::{OAuthToken, Provider, SessionGroup};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Remembered session group id per user, shared across requests.
///
/// Entries are revalidated against the repository before use and dropped
/// with [`SessionGroupCache::invalidate`] when they no longer check out.
#[derive(Clone, Default)]
pub struct SessionGroupCache {
    groups: Arc<DashMap<String, String>>,
    /// Serializes group creation per user within this process.
    creating: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SessionGroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> Option<String> {
        self.groups.get(user_id).map(|id| id.clone())
    }

    pub fn remember(&self, user_id: &str, group_id: &str) {
        self.groups
            .insert(user_id.to_string(), group_id.to_string());
    }

    pub fn invalidate(&self, user_id: &str) {
        self.groups.remove(user_id);
    }

    fn creation_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.creating
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }
}

/// Token store for one authenticated user.
pub struct TokenStore {
    repo: Arc<dyn TokenRepository>,
    cache: SessionGroupCache,
    user_id: String,
    /// Group id the client cached locally, if it sent one.
    client_hint: Option<String>,
    group_id: OnceCell<String>,
}

impl TokenStore {
    pub fn new(
        repo: Arc<dyn TokenRepository>,
        cache: SessionGroupCache,
        user_id: impl Into<String>,
        client_hint: Option<String>,
    ) -> Self {
        Self {
            repo,
            cache,
            user_id: user_id.into(),
            client_hint: client_hint.filter(|h| !h.trim().is_empty()),
            group_id: OnceCell::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The group id if this store has already resolved one.
    pub fn resolved_group_id(&self) -> Option<&str> {
        self.group_id.get().map(String::as_str)
    }

    // ─── Session Group Resolution ───────────────────────────────────────────

    /// Resolve the session group, creating one if no valid group exists.
    ///
    /// Returns `None` only when persistence is unavailable.
    pub async fn session_group_id(&self) -> Option<String> {
        match self
            .group_id
            .get_or_try_init(|| self.resolve_or_create_group())
            .await
        {
            Ok(id) => Some(id.clone()),
            Err(e) => {
                tracing::error!(error = %e, user_id = %self.user_id, "Failed to resolve session group");
                None
            }
        }
    }

    /// Resolve an existing group without creating one (read paths).
    async fn existing_group_id(&self) -> Option<String> {
        if let Some(id) = self.group_id.get() {
            return Some(id.clone());
        }

        match self.find_valid_group().await {
            Ok(Some(id)) => {
                // A concurrent resolver may have won; either value is valid.
                let _ = self.group_id.set(id.clone());
                Some(id)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, user_id = %self.user_id, "Failed to look up session group");
                None
            }
        }
    }

    async fn resolve_or_create_group(&self) -> Result<String, AppError> {
        if let Some(id) = self.find_valid_group().await? {
            return Ok(id);
        }

        let lock = self.cache.creation_lock(&self.user_id);
        let _creating = lock.lock().await;

        // Another store for this user may have created one while we waited.
        if let Some(id) = self.find_valid_group().await? {
            return Ok(id);
        }

        let group = SessionGroup::new_for_user(&self.user_id, Utc::now());
        self.repo.create_session_group(&group).await?;

        // Another instance may have raced us; everyone adopts the oldest.
        let id = match self.repo.find_session_group_for_user(&self.user_id).await? {
            Some(oldest) => oldest.id,
            None => group.id.clone(),
        };
        self.cache.remember(&self.user_id, &id);

        if id == group.id {
            tracing::info!(user_id = %self.user_id, session_group_id = %id, "Created session group");
        } else {
            tracing::info!(
                user_id = %self.user_id,
                session_group_id = %id,
                discarded = %group.id,
                "Adopted existing session group"
            );
        }
        Ok(id)
    }

    /// Check the client's cached id, then the server-side cache, against the
    /// repository, then fall back to looking the group up by user. A
    /// candidate is valid only if it exists and belongs to this user.
    async fn find_valid_group(&self) -> Result<Option<String>, AppError> {
        let cached = self.cache.get(&self.user_id);

        let mut candidates: Vec<&str> = Vec::with_capacity(2);
        if let Some(hint) = self.client_hint.as_deref() {
            candidates.push(hint);
        }
        if let Some(cached) = cached.as_deref() {
            if !candidates.contains(&cached) {
                candidates.push(cached);
            }
        }

        for candidate in candidates {
            match self.repo.get_session_group(candidate).await? {
                Some(group) if group.user_id == self.user_id => {
                    self.cache.remember(&self.user_id, &group.id);
                    return Ok(Some(group.id));
                }
                Some(_) => {
                    tracing::warn!(
                        user_id = %self.user_id,
                        session_group_id = candidate,
                        "Session group belongs to another user, ignoring"
                    );
                }
                None => {
                    tracing::debug!(session_group_id = candidate, "Cached session group not found");
                }
            }

            if cached.as_deref() == Some(candidate) {
                self.cache.invalidate(&self.user_id);
            }
        }

        match self.repo.find_session_group_for_user(&self.user_id).await? {
            Some(group) => {
                self.cache.remember(&self.user_id, &group.id);
                Ok(Some(group.id))
            }
            None => Ok(None),
        }
    }

    // ─── Token Operations ───────────────────────────────────────────────────

    /// Upsert the token for `provider`. Returns `false` on any failure.
    pub async fn save_token(
        &self,
        provider: Provider,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> bool {
        let Some(session_group_id) = self.session_group_id().await else {
            return false;
        };

        let token = OAuthToken {
            session_group_id,
            provider,
            access_token: Some(access_token.to_string()),
            refresh_token: refresh_token.map(String::from),
            expires_at,
            updated_at: Utc::now(),
        };

        match self.repo.upsert_token(&token).await {
            Ok(()) => {
                tracing::debug!(%provider, "Token saved");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, %provider, "Failed to save token");
                false
            }
        }
    }

    /// Look up the token for `provider`.
    pub async fn get_token(&self, provider: Provider) -> Option<OAuthToken> {
        let session_group_id = self.existing_group_id().await?;

        match self.repo.get_token(&session_group_id, provider).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, %provider, "Failed to load token");
                None
            }
        }
    }

    /// All tokens in the session group.
    pub async fn get_all_tokens(&self) -> Vec<OAuthToken> {
        let Some(session_group_id) = self.existing_group_id().await else {
            return Vec::new();
        };

        match self.repo.list_tokens(&session_group_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list tokens");
                Vec::new()
            }
        }
    }

    /// Delete the token for `provider`. Returns `false` on any failure.
    pub async fn remove_token(&self, provider: Provider) -> bool {
        let Some(session_group_id) = self.existing_group_id().await else {
            return false;
        };

        match self.repo.delete_token(&session_group_id, provider).await {
            Ok(()) => {
                tracing::info!(%provider, "Token removed");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, %provider, "Failed to remove token");
                false
            }
        }
    }
}
