//! Bar provider trait and structured error types.
//!
//! The `BarProvider` trait abstracts over data sources so the caller can swap
//! the network client for a CSV import or a deterministic fake in tests.

use thiserror::Error;

use crate::domain::{BarSeries, Timeframe};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("market data endpoint blocked (circuit breaker open, {remaining_secs}s left)")]
    CircuitBreakerTripped { remaining_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// A source of historical bars.
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch up to `count` most recent bars for `symbol` on `timeframe`,
    /// oldest first. Implementations set `BarSeries::as_of` to the retrieval
    /// time when it is meaningful for forming-bar detection.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<BarSeries, DataError>;
}

impl<P: BarProvider + ?Sized> BarProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<BarSeries, DataError> {
        (**self).fetch_bars(symbol, timeframe, count)
    }
}
