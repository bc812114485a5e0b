// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod calendar;
pub mod provider;
pub mod sleep;
pub mod token;

pub use calendar::CalendarEvent;
pub use provider::Provider;
pub use sleep::{BalanceKind, DaySleep, SleepDebtOrCapital, SleepSession};
pub use token::{OAuthToken, SessionGroup};
