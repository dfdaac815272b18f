//! fxsize core: ATR volatility estimation and risk-based position sizing.
//!
//! This crate contains:
//! - Domain types (bars, bar series, timeframes, contract conventions)
//! - The volatility estimator: True Range, simple/Wilder ATR with validation
//! - The position sizer: risk budget and stop distance to units and lots
//! - Static reference tables (default daily ATR, pip size, timeframe factors)
//! - Bar providers (MetaAPI REST, CSV import) behind one trait
//! - Caller-side pipeline with an explicit fallback policy
//! - TOML configuration with environment overrides

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod pipeline;
pub mod reference;
pub mod sizers;

#[cfg(feature = "test-util")]
pub mod testing;

pub use error::SizingError;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types are Send + Sync, so calculations can run
    /// from any thread without coordination.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::Timeframe>();
        require_sync::<domain::Timeframe>();
        require_send::<domain::ContractSpec>();
        require_sync::<domain::ContractSpec>();

        // Estimator and sizer types
        require_send::<indicators::AtrParams>();
        require_sync::<indicators::AtrParams>();
        require_send::<indicators::AtrResult>();
        require_sync::<indicators::AtrResult>();
        require_send::<sizers::RiskParameters>();
        require_sync::<sizers::RiskParameters>();
        require_send::<sizers::PositionSize>();
        require_sync::<sizers::PositionSize>();
        require_send::<SizingError>();
        require_sync::<SizingError>();

        // Providers
        require_send::<data::MetaApiProvider>();
        require_sync::<data::MetaApiProvider>();
        require_send::<data::CsvProvider>();
        require_sync::<data::CsvProvider>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();

        // Pipeline
        require_send::<pipeline::Calculator<data::CsvProvider>>();
        require_sync::<pipeline::Calculator<data::CsvProvider>>();
        require_send::<pipeline::SizingOutcome>();
        require_sync::<pipeline::SizingOutcome>();
    }

    /// The reference table is plain static data.
    #[test]
    fn reference_table_is_static() {
        fn require_static<T: 'static>(_: &T) {}
        require_static(&reference::SYMBOL_TABLE);
    }

    /// The estimator is a free function of its inputs: the signature takes
    /// shared references only and returns an owned result.
    #[test]
    fn estimator_signature_is_pure() {
        fn _check(
            series: &domain::BarSeries,
            params: &indicators::AtrParams,
        ) -> Result<indicators::AtrResult, SizingError> {
            indicators::compute_atr(series, params)
        }
    }
}
