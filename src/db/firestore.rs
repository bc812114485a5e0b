// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Session groups (ownership of shared tokens)
//! - OAuth tokens (one document per session group and provider)

use crate::db::{collections, oldest_group, TokenRepository};
use crate::error::AppError;
use crate::models::{OAuthToken, Provider, SessionGroup};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator rejects real credentials, so talk to it unauthenticated.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl TokenRepository for FirestoreDb {
    // ─── Session Group Operations ────────────────────────────────

    async fn get_session_group(&self, id: &str) -> Result<Option<SessionGroup>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::SESSION_GROUPS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn create_session_group(&self, group: &SessionGroup) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::SESSION_GROUPS)
            .document_id(&group.id)
            .object(group)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_session_group_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<SessionGroup>, AppError> {
        let user_id = user_id.to_string();

        let groups: Vec<SessionGroup> = self
            .client
            .fluent()
            .select()
            .from(collections::SESSION_GROUPS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(oldest_group(groups))
    }

    // ─── Token Operations ────────────────────────────────────────

    async fn upsert_token(&self, token: &OAuthToken) -> Result<(), AppError> {
        let doc_id = OAuthToken::storage_key(&token.session_group_id, token.provider);

        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::OAUTH_TOKENS)
            .document_id(&doc_id)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_token(
        &self,
        session_group_id: &str,
        provider: Provider,
    ) -> Result<Option<OAuthToken>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::OAUTH_TOKENS)
            .obj()
            .one(&OAuthToken::storage_key(session_group_id, provider))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_tokens(&self, session_group_id: &str) -> Result<Vec<OAuthToken>, AppError> {
        let session_group_id = session_group_id.to_string();

        self.client
            .fluent()
            .select()
            .from(collections::OAUTH_TOKENS)
            .filter(move |q| q.for_all([q.field("session_group_id").eq(session_group_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_token(
        &self,
        session_group_id: &str,
        provider: Provider,
    ) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collections::OAUTH_TOKENS)
            .document_id(OAuthToken::storage_key(session_group_id, provider))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
