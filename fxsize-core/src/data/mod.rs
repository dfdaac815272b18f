//! Market-data providers.
//!
//! The estimator never fetches data itself. A caller picks one
//! [`BarProvider`] implementation and hands the resulting [`BarSeries`]
//! to the core:
//! - [`MetaApiProvider`]: historical candles from the MetaAPI REST service
//! - [`CsvProvider`]: bars exported to CSV files
//!
//! [`BarSeries`]: crate::domain::BarSeries

pub mod circuit_breaker;
pub mod csv_import;
pub mod metaapi;
pub mod provider;

pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use metaapi::{MetaApiCredentials, MetaApiProvider};
pub use provider::{BarProvider, DataError};
