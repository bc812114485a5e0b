// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background gradient that follows the user's waking day.

use crate::models::SleepDebtOrCapital;
use serde::Serialize;
use std::f64::consts::PI;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Peak relative brightness swing over a 24 h cycle.
const LUMINANCE_AMPLITUDE: f64 = 0.05;

/// Dimming per hour of sleep debt.
const DEBT_DIMMING_PER_HOUR: f64 = 0.02;

/// Debt beyond this no longer dims further.
const MAX_DIMMING_DEBT_HOURS: f64 = 4.0;

/// How far ahead of "now" the lower gradient stops look.
const GRADIENT_LOOKAHEAD: [f64; 3] = [0.0, 0.08, 0.16];

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    fn scale(self, factor: f64) -> Rgb {
        let apply = |c: u8| (f64::from(c) * factor).round().clamp(0.0, 255.0) as u8;
        Rgb(apply(self.0), apply(self.1), apply(self.2))
    }
}

/// Palette keyed by progress through the waking day, wake (0) to bed (1).
const PALETTE: [(f64, Rgb); 6] = [
    (0.0, Rgb(0xff, 0xb3, 0x8a)),  // dawn
    (0.2, Rgb(0xff, 0xe2, 0x9a)),  // morning
    (0.45, Rgb(0x9f, 0xd8, 0xff)), // midday
    (0.7, Rgb(0xff, 0xc3, 0x6b)),  // afternoon
    (0.85, Rgb(0xe0, 0x77, 0x7d)), // dusk
    (1.0, Rgb(0x3a, 0x3f, 0x73)),  // night
];

/// Palette color at `progress` in [0, 1].
pub fn palette_color(progress: f64) -> Rgb {
    let progress = progress.clamp(0.0, 1.0);

    for pair in PALETTE.windows(2) {
        let (lo, lo_color) = pair[0];
        let (hi, hi_color) = pair[1];
        if progress <= hi {
            return lo_color.lerp(hi_color, (progress - lo) / (hi - lo));
        }
    }

    PALETTE[PALETTE.len() - 1].1
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GradientStop {
    /// Percent down the gradient.
    pub position: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CircadianGradient {
    /// Fraction of the wake-to-bed interval elapsed, in [0, 1].
    pub progress: f64,
    pub hours_since_wake: f64,
    pub luminance: f64,
    pub stops: Vec<GradientStop>,
}

impl CircadianGradient {
    /// Render as a CSS `linear-gradient`.
    pub fn css(&self) -> String {
        let stops: Vec<String> = self
            .stops
            .iter()
            .map(|s| format!("{} {}%", s.color, s.position))
            .collect();
        format!("linear-gradient(180deg, {})", stops.join(", "))
    }
}

/// Compute the gradient for `current_hour` given the wake and bed hours.
///
/// All hours are decimal hours of the day. A bed hour at or before the wake
/// hour is taken to fall on the next day, and a current hour before waking is
/// taken as late the same night.
pub fn circadian_gradient(
    current_hour: f64,
    wake_hour: f64,
    bed_hour: f64,
    balance: Option<&SleepDebtOrCapital>,
) -> CircadianGradient {
    let wake = wake_hour.rem_euclid(24.0);
    let mut bed = bed_hour.rem_euclid(24.0);
    let mut current = current_hour.rem_euclid(24.0);

    if bed <= wake {
        bed += 24.0;
    }
    if current < wake {
        current += 24.0;
    }

    let hours_since_wake = current - wake;
    let progress = (hours_since_wake / (bed - wake)).clamp(0.0, 1.0);

    let debt = balance
        .map(SleepDebtOrCapital::debt_hours)
        .unwrap_or(0.0)
        .min(MAX_DIMMING_DEBT_HOURS);
    let luminance = 1.0 + LUMINANCE_AMPLITUDE * (2.0 * PI * hours_since_wake / 24.0).sin()
        - DEBT_DIMMING_PER_HOUR * debt;

    let last = GRADIENT_LOOKAHEAD.len() - 1;
    let stops = GRADIENT_LOOKAHEAD
        .iter()
        .enumerate()
        .map(|(i, ahead)| GradientStop {
            position: (i * 100 / last) as f64,
            color: palette_color(progress + ahead).scale(luminance).to_hex(),
        })
        .collect();

    CircadianGradient {
        progress,
        hours_since_wake,
        luminance,
        stops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BalanceKind;

    #[test]
    fn test_palette_endpoints() {
        assert_eq!(palette_color(0.0), PALETTE[0].1);
        assert_eq!(palette_color(1.0), PALETTE[5].1);
        assert_eq!(palette_color(0.45), PALETTE[2].1);
        assert_eq!(palette_color(-3.0), PALETTE[0].1);
    }

    #[test]
    fn test_progress_through_day() {
        let g = circadian_gradient(15.0, 7.0, 23.0, None);
        assert_eq!(g.progress, 0.5);
        assert_eq!(g.hours_since_wake, 8.0);
        assert_eq!(g.stops.len(), 3);
        assert_eq!(g.stops[2].position, 100.0);
    }

    #[test]
    fn test_wraparound_bed_after_midnight() {
        // Wake 10:00, bed 02:00. At 01:00 the day is nearly over.
        let g = circadian_gradient(1.0, 10.0, 2.0, None);
        assert_eq!(g.hours_since_wake, 15.0);
        assert!((g.progress - 15.0 / 16.0).abs() < 1e-9);

        // Asleep past bed time clamps to the end.
        let asleep = circadian_gradient(5.0, 10.0, 2.0, None);
        assert_eq!(asleep.progress, 1.0);
    }

    #[test]
    fn test_luminance_perturbation_is_small() {
        for hour in 0..24 {
            let g = circadian_gradient(f64::from(hour), 6.5, 22.5, None);
            assert!((g.luminance - 1.0).abs() <= LUMINANCE_AMPLITUDE + 1e-12);
        }
    }

    #[test]
    fn test_sleep_debt_dims() {
        let debt = SleepDebtOrCapital {
            kind: BalanceKind::Debt,
            hours: 10.0,
            days_count: 7,
        };
        let rested = circadian_gradient(12.0, 7.0, 23.0, None);
        let tired = circadian_gradient(12.0, 7.0, 23.0, Some(&debt));

        assert!((rested.luminance - tired.luminance - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_css_rendering() {
        let g = circadian_gradient(7.0, 7.0, 23.0, None);
        assert_eq!(g.stops[0].color, "#ffb38a");
        assert!(g.css().starts_with("linear-gradient(180deg, #ffb38a 0%, "));
        assert!(g.css().ends_with("100%)"));
    }
}
