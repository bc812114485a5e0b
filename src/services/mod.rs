// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod authorized;
pub mod calendar;
pub mod circadian;
pub mod connections;
pub mod dashboard;
pub mod feed;
pub mod provider_detect;
pub mod refresh;
pub mod sleep;
pub mod sun;
pub mod token_store;
pub mod token_validator;

pub use authorized::{ApiFailure, ProviderSession};
pub use calendar::{GoogleCalendarSource, MicrosoftCalendarSource};
pub use connections::{capture_token, check_connections, CaptureRequest, ProviderConnections};
pub use dashboard::{Dashboard, DashboardSnapshot, PollerHandle};
pub use feed::{Feed, FeedSource, FeedState, FeedStatus};
pub use refresh::{RefreshCoordinator, RefreshProxyClient};
pub use sleep::{GoogleFitSleepSource, SleepHistory};
pub use sun::{calculate_sun_times_from_base, SunClient, SunTimes};
pub use token_store::{SessionGroupCache, TokenStore};
