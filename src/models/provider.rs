// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supported OAuth providers and provider-name canonicalization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// An external identity/data provider a user can connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Provider {
    Google,
    Microsoft,
    Apple,
    Facebook,
    Amazon,
}

impl Provider {
    /// Every provider, in display order.
    pub const ALL: [Provider; 5] = [
        Provider::Google,
        Provider::Microsoft,
        Provider::Apple,
        Provider::Facebook,
        Provider::Amazon,
    ];

    /// Stable lowercase name used in storage keys and URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Microsoft => "microsoft",
            Provider::Apple => "apple",
            Provider::Facebook => "facebook",
            Provider::Amazon => "amazon",
        }
    }

    /// Human-readable name for status messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::Microsoft => "Microsoft",
            Provider::Apple => "Apple",
            Provider::Facebook => "Facebook",
            Provider::Amazon => "Amazon",
        }
    }

    /// Map any provider alias seen in the wild onto a supported provider.
    ///
    /// The identity broker, stored rows, and URL paths all spell providers
    /// differently ("azure", "azuread", "outlook" all mean Microsoft). This is
    /// the only place those spellings are interpreted.
    pub fn canonicalize(name: &str) -> Option<Provider> {
        let normalized = name.trim().to_ascii_lowercase();
        let provider = match normalized.as_str() {
            "google" | "gmail" | "google-oauth2" | "googleapis" => Provider::Google,
            "microsoft" | "azure" | "azuread" | "azure-ad" | "azure_ad" | "outlook"
            | "office365" | "live" | "hotmail" | "msft" => Provider::Microsoft,
            "apple" | "icloud" | "appleid" | "sign-in-with-apple" => Provider::Apple,
            "facebook" | "meta" | "fb" => Provider::Facebook,
            "amazon" | "login-with-amazon" | "lwa" => Provider::Amazon,
            _ => return None,
        };
        Some(provider)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a provider name has no canonical mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::canonicalize(s).ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microsoft_aliases() {
        for alias in ["azure", "AzureAD", "outlook", " Microsoft ", "azure-ad", "live"] {
            assert_eq!(Provider::canonicalize(alias), Some(Provider::Microsoft), "{alias}");
        }
    }

    #[test]
    fn test_round_trip_names() {
        for provider in Provider::ALL {
            assert_eq!(provider.as_str().parse::<Provider>(), Ok(provider));
        }
    }

    #[test]
    fn test_unknown_provider() {
        assert_eq!(Provider::canonicalize("strava"), None);
        assert!("".parse::<Provider>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Provider::Microsoft).unwrap();
        assert_eq!(json, "\"microsoft\"");
    }
}
