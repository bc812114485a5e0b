// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sunrise/sunset for the dashboard's time-of-day dial.
//!
//! The current day comes from a sunrise/sunset lookup service. Other days are
//! projected from that one measurement with a seasonal cosine model. The
//! projection is an approximation and is not checked against an
//! astronomical reference.

use crate::error::AppError;
use crate::time_utils::{decimal_hour, utc_offset_hours};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Largest seasonal swing of day length from 12 h, reached at the polar circle.
pub const MAX_SEASONAL_VARIATION_HOURS: f64 = 6.0;

/// Latitude at and beyond which the seasonal swing is at its maximum.
pub const POLAR_CIRCLE_LATITUDE: f64 = 66.5;

/// Day of year of the June solstice.
const NORTHERN_SUMMER_SOLSTICE_DOY: f64 = 172.0;

/// Day of year of the December solstice.
const SOUTHERN_SUMMER_SOLSTICE_DOY: f64 = 355.0;

const DAYS_PER_YEAR: f64 = 365.0;

/// Below this, a modeled day length is too small to calibrate against.
const MIN_CALIBRATION_HOURS: f64 = 0.01;

/// Local sunrise and sunset as decimal hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SunTimes {
    pub sunrise: f64,
    pub sunset: f64,
}

#[derive(Debug, Deserialize)]
struct SunApiResponse {
    status: String,
    results: Option<SunApiResults>,
}

#[derive(Debug, Deserialize)]
struct SunApiResults {
    sunrise: DateTime<Utc>,
    sunset: DateTime<Utc>,
}

/// Client for a sunrise-sunset.org compatible lookup service.
#[derive(Clone)]
pub struct SunClient {
    http: reqwest::Client,
    base_url: String,
}

impl SunClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Measured sun times for `date` at a location, in `tz` local hours.
    pub async fn sun_times(
        &self,
        lat: f64,
        lng: f64,
        date: NaiveDate,
        tz: Tz,
    ) -> Result<SunTimes, AppError> {
        let url = format!("{}/json", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lng", lng.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
                ("formatted", "0".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Sun lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Sun lookup returned {}",
                response.status()
            )));
        }

        let body: SunApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Sun lookup parse error: {}", e)))?;

        match body.results {
            Some(results) if body.status == "OK" => Ok(SunTimes {
                sunrise: decimal_hour(results.sunrise, tz),
                sunset: decimal_hour(results.sunset, tz),
            }),
            _ => Err(AppError::Upstream(format!(
                "Sun lookup status {}",
                body.status
            ))),
        }
    }
}

/// Modeled day length in hours for a day of year at `latitude`.
pub fn model_day_length(day_of_year: u32, latitude: f64) -> f64 {
    let amplitude =
        (latitude.abs() / POLAR_CIRCLE_LATITUDE).min(1.0) * MAX_SEASONAL_VARIATION_HOURS;

    let solstice = if latitude >= 0.0 {
        NORTHERN_SUMMER_SOLSTICE_DOY
    } else {
        SOUTHERN_SUMMER_SOLSTICE_DOY
    };

    let phase = 2.0 * PI * (f64::from(day_of_year) - solstice) / DAYS_PER_YEAR;
    12.0 + amplitude * phase.cos()
}

/// Project the sun times measured on `base_date` onto `target_date`.
///
/// The cosine model is scaled so it reproduces the measured base day length,
/// and the projected day is centered on the base day's solar midpoint, then
/// shifted by any UTC offset change between the two dates.
pub fn calculate_sun_times_from_base(
    base_date: NaiveDate,
    target_date: NaiveDate,
    sunrise: f64,
    sunset: f64,
    latitude: f64,
    tz: Tz,
) -> SunTimes {
    if base_date == target_date {
        return SunTimes { sunrise, sunset };
    }

    let measured = if sunset >= sunrise {
        sunset - sunrise
    } else {
        sunset + 24.0 - sunrise
    };
    let midpoint = sunrise + measured / 2.0;

    let model_base = model_day_length(base_date.ordinal(), latitude);
    let model_target = model_day_length(target_date.ordinal(), latitude);

    let day_length = if model_base > MIN_CALIBRATION_HOURS {
        measured * model_target / model_base
    } else {
        model_target
    }
    .clamp(0.0, 24.0);

    let dst_shift = utc_offset_hours(tz, target_date) - utc_offset_hours(tz, base_date);

    SunTimes {
        sunrise: clamp_hour(midpoint - day_length / 2.0 + dst_shift),
        sunset: clamp_hour(midpoint + day_length / 2.0 + dst_shift),
    }
}

fn clamp_hour(hour: f64) -> f64 {
    if hour.is_nan() {
        return 0.0;
    }
    hour.clamp(0.0, 24.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(year: i32, month: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, d).unwrap()
    }

    #[test]
    fn test_same_day_is_identity() {
        let today = day(2024, 5, 1);
        for (sunrise, sunset) in [(6.25, 20.1), (0.0, 24.0), (7.3, 3.2)] {
            let projected = calculate_sun_times_from_base(
                today,
                today,
                sunrise,
                sunset,
                47.6,
                chrono_tz::America::Los_Angeles,
            );
            assert_eq!(projected, SunTimes { sunrise, sunset });
        }
    }

    #[test]
    fn test_projection_stays_in_range_everywhere() {
        let base = day(2023, 1, 1);
        let zones = [Tz::UTC, chrono_tz::Europe::Oslo, chrono_tz::Australia::Sydney];

        for lat in (-90..=90).step_by(5) {
            for doy in 1..=365 {
                let target = base + chrono::Duration::days(doy);
                for tz in zones {
                    for (sunrise, sunset) in [(6.0, 18.0), (0.0, 24.0), (11.9, 12.1), (9.0, 2.0)] {
                        let sun = calculate_sun_times_from_base(
                            base,
                            target,
                            sunrise,
                            sunset,
                            f64::from(lat),
                            tz,
                        );
                        assert!((0.0..=24.0).contains(&sun.sunrise), "{lat} {doy} {sun:?}");
                        assert!((0.0..=24.0).contains(&sun.sunset), "{lat} {doy} {sun:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_summer_days_are_longer_in_north() {
        let winter = day(2024, 12, 21);
        let summer = day(2024, 6, 20);
        let sun = calculate_sun_times_from_base(winter, summer, 8.0, 16.0, 50.0, Tz::UTC);

        assert!(sun.sunset - sun.sunrise > 8.0);
        // Centered on the measured midpoint.
        assert!(((sun.sunrise + sun.sunset) / 2.0 - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_southern_hemisphere_is_inverted() {
        assert!(model_day_length(172, -40.0) < 12.0);
        assert!(model_day_length(355, -40.0) > 12.0);
        assert_eq!(model_day_length(80, 0.0), 12.0);
    }

    #[test]
    fn test_dst_change_shifts_times() {
        let tz = chrono_tz::Europe::Berlin;
        // One day apart across the spring change: day length barely moves.
        let base = day(2024, 3, 30);
        let target = day(2024, 3, 31);
        let sun = calculate_sun_times_from_base(base, target, 6.0, 18.5, 52.5, tz);

        assert!((sun.sunrise - 7.0).abs() < 0.1, "{sun:?}");
        assert!((sun.sunset - 19.5).abs() < 0.1, "{sun:?}");
    }

    #[test]
    fn test_polar_extremes_clamp() {
        let base = day(2024, 12, 21);
        let target = day(2024, 6, 21);
        let sun = calculate_sun_times_from_base(base, target, 11.0, 13.0, 80.0, Tz::UTC);
        assert!(sun.sunrise >= 0.0 && sun.sunset <= 24.0);
        assert!(sun.sunset > sun.sunrise);
    }
}
