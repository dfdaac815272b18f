//! Volatility indicators.
//!
//! Only the Average True Range is needed for sizing. It is exposed both as
//! raw series helpers (`true_range`, `wilder_smooth`) and as the validated
//! single-value estimator `compute_atr`.

pub mod atr;

pub use atr::{compute_atr, true_range, wilder_smooth, AtrParams, AtrResult, Smoothing};

/// Create bars from (high, low, close) triples, one hour apart, for testing.
/// Open is the previous close (or the close for the first bar).
#[cfg(test)]
pub fn make_hlc_bars(data: &[(f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(high, low, close))| {
            let open = if i == 0 { close } else { data[i - 1].2 };
            Bar::new(
                base + chrono::Duration::hours(i as i64),
                open.clamp(low, high),
                high,
                low,
                close,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
