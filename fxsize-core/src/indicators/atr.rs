//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! Default smoothing is a simple mean of the most recent `periods` True Range
//! values. Wilder smoothing (EMA with alpha = 1/period) is available on request.
//! Needs periods+1 closed bars: the first bar only supplies a previous close.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Bar, BarSeries, Timeframe};
use crate::error::SizingError;

/// How True Range values are averaged into an ATR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    /// Arithmetic mean of the last `periods` values.
    #[default]
    Simple,
    /// Wilder's recursive smoothing seeded with the mean of the first `periods` values.
    Wilder,
}

/// Parameters for one ATR calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtrParams {
    pub periods: usize,
    #[serde(default)]
    pub smoothing: Smoothing,
    /// Keep a bar whose interval had not closed when the series was fetched.
    #[serde(default)]
    pub include_forming_bar: bool,
}

impl AtrParams {
    pub fn new(periods: usize) -> Self {
        Self {
            periods,
            smoothing: Smoothing::Simple,
            include_forming_bar: false,
        }
    }

    pub fn wilder(mut self) -> Self {
        self.smoothing = Smoothing::Wilder;
        self
    }

    pub fn including_forming_bar(mut self) -> Self {
        self.include_forming_bar = true;
        self
    }

    /// Closed bars needed for a result. Saturates at `usize::MAX`.
    pub fn required_bars(&self) -> usize {
        self.periods.saturating_add(1)
    }
}

impl Default for AtrParams {
    fn default() -> Self {
        Self::new(14)
    }
}

/// A validated ATR value and the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtrResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub periods: usize,
    pub smoothing: Smoothing,
    /// Always finite and > 0, in price units.
    pub value: f64,
    pub bars_used: usize,
    pub true_ranges_discarded: usize,
    pub forming_bars_excluded: usize,
    pub last_bar_timestamp: DateTime<Utc>,
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    let h = bars[0].high;
    let l = bars[0].low;
    if h.is_nan() || l.is_nan() {
        tr[0] = f64::NAN;
    } else {
        tr[0] = h - l;
    }

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            tr[i] = f64::NAN;
        } else {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

/// Apply Wilder smoothing to a series. Alpha = 1/period.
///
/// Seed: mean of the first `period` consecutive non-NaN values. A NaN after
/// the seed invalidates the rest of the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let seed_start = (0..=n - period).find(|&i| values[i..i + period].iter().all(|v| !v.is_nan()));

    let seed_start = match seed_start {
        Some(s) => s,
        None => return result,
    };

    let seed_end = seed_start + period;

    let seed: f64 = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;

    for i in seed_end..n {
        if values[i].is_nan() {
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }
        let smoothed = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }

    result
}

/// Compute a single ATR value from a bar series.
///
/// The series is sorted internally, so input order does not matter. Bars
/// still forming at `series.as_of` are left out unless
/// `params.include_forming_bar` is set. Non-finite or non-positive True Range
/// values are discarded before averaging.
pub fn compute_atr(series: &BarSeries, params: &AtrParams) -> Result<AtrResult, SizingError> {
    let periods = params.periods;
    if periods == 0 {
        return Err(SizingError::invalid_parameter(
            "periods",
            0.0,
            "ATR period must be >= 1",
        ));
    }
    let Some(required) = periods.checked_add(1) else {
        return Err(SizingError::invalid_parameter(
            "periods",
            periods as f64,
            "ATR period is too large",
        ));
    };

    let bars = if params.include_forming_bar {
        series.sorted_bars()
    } else {
        series.closed_bars_sorted()
    };
    let forming_bars_excluded = series.len() - bars.len();

    if bars.len() < required {
        return Err(SizingError::insufficient(
            series.symbol.clone(),
            series.timeframe,
            bars.len(),
            required,
        ));
    }

    // TR[0] has no previous close; skip it.
    let tr = true_range(&bars);
    let mut valid = Vec::with_capacity(tr.len() - 1);
    let mut flat = 0usize;
    for &v in &tr[1..] {
        if v.is_finite() && v > 0.0 {
            valid.push(v);
        } else if v == 0.0 {
            flat += 1;
        }
    }
    let true_ranges_discarded = tr.len() - 1 - valid.len();

    if valid.len() < periods {
        if valid.is_empty() && flat >= periods {
            return Err(SizingError::InvalidResult {
                symbol: series.symbol.clone(),
                timeframe: series.timeframe,
                value: 0.0,
                reason: "zero volatility: every bar in the window is flat".into(),
            });
        }
        return Err(SizingError::insufficient(
            series.symbol.clone(),
            series.timeframe,
            valid.len(),
            periods,
        ));
    }

    let value = match params.smoothing {
        Smoothing::Simple => {
            let window = &valid[valid.len() - periods..];
            window.iter().sum::<f64>() / periods as f64
        }
        Smoothing::Wilder => wilder_smooth(&valid, periods)
            .last()
            .copied()
            .unwrap_or(f64::NAN),
    };

    if !value.is_finite() || value <= 0.0 {
        return Err(SizingError::InvalidResult {
            symbol: series.symbol.clone(),
            timeframe: series.timeframe,
            value,
            reason: "ATR must be finite and > 0".into(),
        });
    }

    let last_bar_timestamp = bars[bars.len() - 1].timestamp;

    debug!(
        symbol = %series.symbol,
        timeframe = %series.timeframe,
        periods,
        smoothing = ?params.smoothing,
        atr = value,
        discarded = true_ranges_discarded,
        forming_excluded = forming_bars_excluded,
        "computed ATR"
    );

    Ok(AtrResult {
        symbol: series.symbol.clone(),
        timeframe: series.timeframe,
        periods,
        smoothing: params.smoothing,
        value,
        bars_used: bars.len(),
        true_ranges_discarded,
        forming_bars_excluded,
        last_bar_timestamp,
    })
}
