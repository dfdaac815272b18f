//! Deterministic bar fixtures for tests and benches (feature `test-util`).
//!
//! A master seed is expanded into per-(symbol, timeframe) sub-seeds with
//! BLAKE3, so one symbol's bars never depend on which other symbols were
//! generated first.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::{BarProvider, DataError};
use crate::domain::{Bar, BarSeries, Timeframe};
use crate::reference;

/// Derive the sub-seed for one (symbol, timeframe) stream.
pub fn sub_seed(master_seed: u64, symbol: &str, timeframe: Timeframe) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(reference::normalize_symbol(symbol).as_bytes());
    hasher.update(timeframe.label().as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Rough starting price for a symbol: JPY crosses near 140, gold near 2000.
fn base_price(symbol: &str) -> f64 {
    let key = reference::normalize_symbol(symbol);
    if key == "XAUUSD" {
        2000.0
    } else if key.ends_with("JPY") {
        140.0
    } else {
        1.10
    }
}

/// Random-walk OHLC bars whose typical range tracks the symbol's reference
/// daily ATR scaled to `timeframe`. Same inputs, same bars.
pub fn synthetic_bars(
    master_seed: u64,
    symbol: &str,
    timeframe: Timeframe,
    count: usize,
    start: DateTime<Utc>,
) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(sub_seed(master_seed, symbol, timeframe));
    let bar_atr = reference::default_daily_atr(symbol).unwrap_or(0.001) * timeframe.daily_factor();

    let mut price = base_price(symbol);
    let mut bars = Vec::with_capacity(count);
    for i in 0..count {
        let open = price;
        let close = open + rng.gen_range(-0.5..0.5) * bar_atr;
        let high = open.max(close) + rng.gen_range(0.05..0.5) * bar_atr;
        let low = open.min(close) - rng.gen_range(0.05..0.5) * bar_atr;
        let volume = rng.gen_range(100..5_000u32) as f64;

        bars.push(Bar {
            timestamp: start + timeframe.duration() * i as i32,
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    bars
}

/// A series whose True Range values are exactly `ranges`.
///
/// Every bar closes at `price` and spans `price ± range/2`, so the previous
/// close always lies inside the next bar. One leading bar supplies the first
/// previous close, giving `ranges.len() + 1` bars.
pub fn series_with_ranges(
    symbol: &str,
    timeframe: Timeframe,
    price: f64,
    ranges: &[f64],
) -> BarSeries {
    let start = fixture_start();
    let bars = std::iter::once(0.0)
        .chain(ranges.iter().copied())
        .enumerate()
        .map(|(i, r)| {
            Bar::new(
                start + timeframe.duration() * i as i32,
                price,
                price + r / 2.0,
                price - r / 2.0,
                price,
            )
        })
        .collect();
    BarSeries::new(symbol, timeframe, bars)
}

/// Fixed start time for fixtures.
pub fn fixture_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// In-memory provider serving [`synthetic_bars`].
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    start: DateTime<Utc>,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start: fixture_start(),
        }
    }
}

impl BarProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "Synthetic"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<BarSeries, DataError> {
        let bars = synthetic_bars(self.seed, symbol, timeframe, count, self.start);
        Ok(BarSeries::new(symbol, timeframe, bars))
    }
}

/// Provider that always fails with the given error kind.
#[derive(Debug, Clone, Copy)]
pub enum FailingProvider {
    Offline,
    Unauthorized,
}

impl BarProvider for FailingProvider {
    fn name(&self) -> &str {
        "Failing"
    }

    fn fetch_bars(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _count: usize,
    ) -> Result<BarSeries, DataError> {
        Err(match self {
            Self::Offline => DataError::NetworkUnreachable("connection refused".into()),
            Self::Unauthorized => DataError::AuthenticationRequired("invalid token".into()),
        })
    }
}
