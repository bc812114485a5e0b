// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token and session group records.

use crate::models::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored OAuth credentials for one provider within a session group.
///
/// Stored at: `oauth_tokens/{session_group_id}_{provider}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub session_group_id: String,
    pub provider: Provider,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl OAuthToken {
    /// Storage key enforcing one record per (session group, provider).
    pub fn storage_key(session_group_id: &str, provider: Provider) -> String {
        format!("{}_{}", urlencoding::encode(session_group_id), provider)
    }

    /// True if the access token is known to be past its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Access token that is present and not known to be expired.
    pub fn usable_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match self.access_token.as_deref() {
            Some(token) if !token.is_empty() && !self.is_expired(now) => Some(token),
            _ => None,
        }
    }
}

/// Logical grouping of tokens shared across a user's browser sessions.
///
/// Stored at: `session_groups/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionGroup {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionGroup {
    /// Create a fresh group owned by `user_id`.
    pub fn new_for_user(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
