// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Provider client secrets live with the backend refresh proxy, not here.
//! This service only needs to know where the proxy and provider APIs are.

use crate::services::dashboard::POLL_INTERVAL;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which token repository backs the token store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStoreKind {
    Firestore,
    Memory,
}

impl FromStr for TokenStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(TokenStoreKind::Firestore),
            "memory" => Ok(TokenStoreKind::Memory),
            _ => Err(ConfigError::Invalid("TOKEN_STORE")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL (allowed CORS origin)
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Base URL of the backend functions host (`{functions_url}/{provider}-token-refresh`)
    pub functions_url: String,
    /// Google APIs base (calendar)
    pub google_api_url: String,
    /// Google Fit base
    pub fit_api_url: String,
    /// Microsoft Graph base
    pub graph_api_url: String,
    /// Sunrise/sunset lookup base
    pub sun_api_url: String,
    /// Token repository selection
    pub token_store: TokenStoreKind,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Background polling interval for the dashboard stream
    pub poll_interval_secs: u64,
    /// Nightly sleep baseline used for debt/capital
    pub sleep_target_hours: f64,

    // --- Secrets ---
    /// Shared secret used by the identity broker to sign session JWTs
    pub session_jwt_secret: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            functions_url: "http://localhost:54321/functions/v1".to_string(),
            google_api_url: "https://www.googleapis.com".to_string(),
            fit_api_url: "https://www.googleapis.com".to_string(),
            graph_api_url: "https://graph.microsoft.com".to_string(),
            sun_api_url: "https://api.sunrise-sunset.org".to_string(),
            token_store: TokenStoreKind::Memory,
            gcp_project_id: "test-project".to_string(),
            poll_interval_secs: POLL_INTERVAL.as_secs(),
            sleep_target_hours: 8.0,
            session_jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            functions_url: env::var("FUNCTIONS_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("FUNCTIONS_URL"))?,
            google_api_url: env_url("GOOGLE_API_URL", "https://www.googleapis.com"),
            fit_api_url: env_url("FIT_API_URL", "https://www.googleapis.com"),
            graph_api_url: env_url("GRAPH_API_URL", "https://graph.microsoft.com"),
            sun_api_url: env_url("SUN_API_URL", "https://api.sunrise-sunset.org"),
            token_store: env::var("TOKEN_STORE")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(POLL_INTERVAL.as_secs()),
            sleep_target_hours: env::var("SLEEP_TARGET_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|hours: &f64| (1.0..=16.0).contains(hours))
                .unwrap_or(8.0),

            session_jwt_secret: env::var("SESSION_JWT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SESSION_JWT_SECRET"))?
                .into_bytes(),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn env_url(name: &str, default: &str) -> String {
    env::var(name)
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .unwrap_or_else(|_| default.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
