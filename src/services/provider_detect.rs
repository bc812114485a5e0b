// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Infer which provider issued an access token.
//!
//! The identity broker hands back one generic "provider token" per sign-in
//! with no provider tag, even when the user has linked several providers.
//! Before storing it we have to work out whose token it is.

use crate::models::Provider;
use crate::services::token_validator::{is_jwt_shaped, GOOGLE_ACCESS_TOKEN_PREFIX};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde_json::Value;

/// base64url that accepts both padded and unpadded input.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Issuer substrings mapped to the provider that uses them.
const ISSUERS: &[(&str, Provider)] = &[
    ("login.microsoftonline.com", Provider::Microsoft),
    ("sts.windows.net", Provider::Microsoft),
    ("login.live.com", Provider::Microsoft),
    ("accounts.google.com", Provider::Google),
    ("appleid.apple.com", Provider::Apple),
    ("facebook.com", Provider::Facebook),
];

/// Detect the provider from the token string alone.
pub fn detect_provider_from_token(access_token: &str) -> Option<Provider> {
    let token = access_token.trim();

    if token.starts_with(GOOGLE_ACCESS_TOKEN_PREFIX) {
        return Some(Provider::Google);
    }

    if is_jwt_shaped(token) {
        let claims = decode_jwt_payload(token)?;
        return detect_provider_from_claims(&claims);
    }

    None
}

/// Match the `iss` claim of already-decoded claims against known issuers.
pub fn detect_provider_from_claims(claims: &Value) -> Option<Provider> {
    let issuer = claims.get("iss")?.as_str()?;
    issuer_provider(issuer)
}

fn issuer_provider(issuer: &str) -> Option<Provider> {
    ISSUERS
        .iter()
        .find(|(needle, _)| issuer.contains(needle))
        .map(|(_, provider)| *provider)
}

/// Decode the middle JWT segment. Any failure means "not detectable".
fn decode_jwt_payload(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;

    let bytes = match URL_SAFE_LENIENT.decode(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Token payload is not base64url");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Token payload is not JSON");
            None
        }
    }
}

/// Classify a freshly returned token: token shape first, then any decoded
/// claims the broker supplied, then the broker's own provider label.
pub fn classify_token(
    access_token: &str,
    claims: Option<&Value>,
    provider_hint: Option<&str>,
) -> Option<Provider> {
    detect_provider_from_token(access_token)
        .or_else(|| claims.and_then(detect_provider_from_claims))
        .or_else(|| provider_hint.and_then(Provider::canonicalize))
}
