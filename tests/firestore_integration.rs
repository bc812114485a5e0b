// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running and
//! `FIRESTORE_EMULATOR_HOST` to point at it.

use chrono::{Duration, SubsecRound, Utc};
use daybreak::db::TokenRepository;
use daybreak::models::{OAuthToken, Provider, SessionGroup};

mod common;
use common::test_db;

fn token(group: &str, provider: Provider, access: &str) -> OAuthToken {
    let now = Utc::now().trunc_subsecs(3);
    OAuthToken {
        session_group_id: group.to_string(),
        provider,
        access_token: Some(access.to_string()),
        refresh_token: Some("1//refresh".to_string()),
        expires_at: Some(now + Duration::hours(1)),
        updated_at: now,
    }
}

#[tokio::test]
async fn test_session_group_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let group = SessionGroup::new_for_user("user-1", Utc::now().trunc_subsecs(3));

    assert!(db.get_session_group(&group.id).await.unwrap().is_none());
    db.create_session_group(&group).await.unwrap();

    let fetched = db.get_session_group(&group.id).await.unwrap().unwrap();
    assert_eq!(fetched.user_id, "user-1");
    assert_eq!(fetched.id, group.id);
}

#[tokio::test]
async fn test_token_upsert_replaces_record() {
    require_emulator!();

    let db = test_db().await;
    let group = uuid::Uuid::new_v4().to_string();

    db.upsert_token(&token(&group, Provider::Google, "ya29.first"))
        .await
        .unwrap();
    db.upsert_token(&token(&group, Provider::Google, "ya29.second"))
        .await
        .unwrap();
    db.upsert_token(&token(&group, Provider::Microsoft, "eyJ.a.b"))
        .await
        .unwrap();

    let google = db
        .get_token(&group, Provider::Google)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(google.access_token.as_deref(), Some("ya29.second"));

    let all = db.list_tokens(&group).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_token_delete() {
    require_emulator!();

    let db = test_db().await;
    let group = uuid::Uuid::new_v4().to_string();

    db.upsert_token(&token(&group, Provider::Google, "ya29.gone"))
        .await
        .unwrap();
    db.delete_token(&group, Provider::Google).await.unwrap();

    assert!(db
        .get_token(&group, Provider::Google)
        .await
        .unwrap()
        .is_none());
    assert!(db.list_tokens(&group).await.unwrap().is_empty());

    // Deleting a missing record is not an error.
    db.delete_token(&group, Provider::Google).await.unwrap();
}
