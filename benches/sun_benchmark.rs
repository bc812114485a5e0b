use chrono::NaiveDate;
use chrono_tz::Tz;
use criterion::{criterion_group, criterion_main, Criterion};
use daybreak::models::{BalanceKind, SleepDebtOrCapital};
use daybreak::services::calculate_sun_times_from_base;
use daybreak::services::circadian::circadian_gradient;
use std::hint::black_box;

fn benchmark_sun_projection(c: &mut Criterion) {
    let base = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
    let tz: Tz = "America/Los_Angeles".parse().expect("valid zone");

    // A full year of projections from one measured day.
    let targets: Vec<NaiveDate> = base.iter_days().take(365).collect();

    let mut group = c.benchmark_group("sun_projection");

    group.bench_function("one_year_mid_latitude", |b| {
        b.iter(|| {
            for target in &targets {
                black_box(calculate_sun_times_from_base(
                    base,
                    *target,
                    6.7,
                    18.0,
                    black_box(37.4),
                    tz,
                ));
            }
        })
    });

    group.bench_function("one_year_polar", |b| {
        b.iter(|| {
            for target in &targets {
                black_box(calculate_sun_times_from_base(
                    base,
                    *target,
                    8.5,
                    15.5,
                    black_box(69.6),
                    Tz::UTC,
                ));
            }
        })
    });

    group.finish();
}

fn benchmark_circadian_gradient(c: &mut Criterion) {
    let debt = SleepDebtOrCapital {
        kind: BalanceKind::Debt,
        hours: 2.5,
        days_count: 7,
    };

    c.bench_function("circadian_gradient_full_day", |b| {
        b.iter(|| {
            for minute in (0..24 * 60).step_by(5) {
                black_box(circadian_gradient(
                    black_box(minute as f64 / 60.0),
                    7.0,
                    23.0,
                    Some(&debt),
                ));
            }
        })
    });
}

criterion_group!(
    benches,
    benchmark_sun_projection,
    benchmark_circadian_gradient
);
criterion_main!(benches);
