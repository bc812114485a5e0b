// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sleep sessions and rolling sleep balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One sleep session, with local decimal bed/wake hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SleepSession {
    pub bed_hour: f64,
    pub wake_hour: f64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_hours: f64,
}

/// Sleep attributed to a single calendar day. Fields are `None` when no
/// session touches that day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DaySleep {
    pub bed_hour: Option<f64>,
    pub wake_hour: Option<f64>,
    pub hours: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum BalanceKind {
    Debt,
    Capital,
}

/// Rolling surplus or deficit of sleep against the target baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SleepDebtOrCapital {
    #[serde(rename = "type")]
    pub kind: BalanceKind,
    pub hours: f64,
    pub days_count: u32,
}

impl SleepDebtOrCapital {
    /// Hours of debt, or zero when in capital.
    pub fn debt_hours(&self) -> f64 {
        match self.kind {
            BalanceKind::Debt => self.hours,
            BalanceKind::Capital => 0.0,
        }
    }
}
