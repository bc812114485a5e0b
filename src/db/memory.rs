// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory token repository for local development and tests.

use crate::db::{oldest_group, TokenRepository};
use crate::error::AppError;
use crate::models::{OAuthToken, Provider, SessionGroup};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-local repository. Clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    groups: Arc<DashMap<String, SessionGroup>>,
    tokens: Arc<DashMap<String, OAuthToken>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail, to exercise error paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored token records across all groups.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(
                "In-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenRepository for MemoryDb {
    async fn get_session_group(&self, id: &str) -> Result<Option<SessionGroup>, AppError> {
        self.check_available()?;
        Ok(self.groups.get(id).map(|g| g.clone()))
    }

    async fn create_session_group(&self, group: &SessionGroup) -> Result<(), AppError> {
        self.check_available()?;
        self.groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    async fn find_session_group_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<SessionGroup>, AppError> {
        self.check_available()?;
        Ok(oldest_group(
            self.groups
                .iter()
                .filter(|entry| entry.user_id == user_id)
                .map(|entry| entry.value().clone()),
        ))
    }

    async fn upsert_token(&self, token: &OAuthToken) -> Result<(), AppError> {
        self.check_available()?;
        let key = OAuthToken::storage_key(&token.session_group_id, token.provider);
        self.tokens.insert(key, token.clone());
        Ok(())
    }

    async fn get_token(
        &self,
        session_group_id: &str,
        provider: Provider,
    ) -> Result<Option<OAuthToken>, AppError> {
        self.check_available()?;
        let key = OAuthToken::storage_key(session_group_id, provider);
        Ok(self.tokens.get(&key).map(|t| t.clone()))
    }

    async fn list_tokens(&self, session_group_id: &str) -> Result<Vec<OAuthToken>, AppError> {
        self.check_available()?;
        let mut tokens: Vec<OAuthToken> = self
            .tokens
            .iter()
            .filter(|entry| entry.session_group_id == session_group_id)
            .map(|entry| entry.value().clone())
            .collect();
        tokens.sort_by_key(|t| t.provider);
        Ok(tokens)
    }

    async fn delete_token(
        &self,
        session_group_id: &str,
        provider: Provider,
    ) -> Result<(), AppError> {
        self.check_available()?;
        self.tokens
            .remove(&OAuthToken::storage_key(session_group_id, provider));
        Ok(())
    }
}
