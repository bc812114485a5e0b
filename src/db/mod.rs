// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, plus an in-memory store for local runs and tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{OAuthToken, Provider, SessionGroup};
use async_trait::async_trait;

/// Collection names as constants.
/// Pick the canonical group out of all groups a user owns.
pub fn oldest_group(groups: impl IntoIterator<Item = SessionGroup>) -> Option<SessionGroup> {
    groups
        .into_iter()
        .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
}

pub mod collections {
    pub const SESSION_GROUPS: &str = "session_groups";
    pub const OAUTH_TOKENS: &str = "oauth_tokens";
}

/// Persistence contract for session groups and per-provider tokens.
///
/// Token writes are upserts keyed by (session group, provider), so a
/// repeated write replaces the earlier record.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn get_session_group(&self, id: &str) -> Result<Option<SessionGroup>, AppError>;

    async fn create_session_group(&self, group: &SessionGroup) -> Result<(), AppError>;

    /// The user's canonical group: the oldest by `created_at`, ties broken
    /// by id, so every caller settles on the same one.
    async fn find_session_group_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<SessionGroup>, AppError>;

    async fn upsert_token(&self, token: &OAuthToken) -> Result<(), AppError>;

    async fn get_token(
        &self,
        session_group_id: &str,
        provider: Provider,
    ) -> Result<Option<OAuthToken>, AppError>;

    async fn list_tokens(&self, session_group_id: &str) -> Result<Vec<OAuthToken>, AppError>;

    async fn delete_token(&self, session_group_id: &str, provider: Provider)
        -> Result<(), AppError>;
}
