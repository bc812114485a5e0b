// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Format checks for stored provider tokens.
//!
//! These are shape heuristics, not introspection: a token that passes may
//! still be revoked upstream. They exist to weed out corrupt or misfiled
//! tokens before they are used.

use crate::models::Provider;

/// Prefix of Google OAuth access tokens.
pub const GOOGLE_ACCESS_TOKEN_PREFIX: &str = "ya29.";

/// Minimum length accepted for providers without a recognizable format.
pub const MIN_OPAQUE_TOKEN_LEN: usize = 20;

/// Judge whether `token` plausibly belongs to `provider`.
pub fn is_token_valid(token: &str, provider: Provider) -> bool {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return false;
    }

    match provider {
        Provider::Google => {
            token.starts_with(GOOGLE_ACCESS_TOKEN_PREFIX)
                && token.len() > GOOGLE_ACCESS_TOKEN_PREFIX.len()
        }
        Provider::Microsoft => is_jwt_shaped(token),
        Provider::Apple | Provider::Facebook | Provider::Amazon => {
            token.len() >= MIN_OPAQUE_TOKEN_LEN
        }
    }
}

/// Three non-empty dot-separated segments.
pub fn is_jwt_shaped(token: &str) -> bool {
    let mut segments = 0;
    for segment in token.split('.') {
        if segment.is_empty() {
            return false;
        }
        segments += 1;
    }
    segments == 3
}
