//! Error taxonomy for a single ATR / sizing calculation.
//!
//! Every variant is terminal for the calculation that raised it. Whether to
//! fall back to reference data or surface the error is the caller's choice.

use thiserror::Error;

use crate::data::DataError;
use crate::domain::Timeframe;

#[derive(Debug, Error)]
pub enum SizingError {
    #[error(
        "insufficient data for {symbol} {timeframe}: {supplied} supplied, {required} required"
    )]
    InsufficientData {
        symbol: String,
        timeframe: Timeframe,
        supplied: usize,
        required: usize,
        /// Set when the shortfall comes from a failed data fetch.
        #[source]
        source: Option<DataError>,
    },

    #[error("invalid ATR result for {symbol} {timeframe}: {value} ({reason})")]
    InvalidResult {
        symbol: String,
        timeframe: Timeframe,
        value: f64,
        reason: String,
    },

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: String,
    },
}

impl SizingError {
    pub fn insufficient(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        supplied: usize,
        required: usize,
    ) -> Self {
        Self::InsufficientData {
            symbol: symbol.into(),
            timeframe,
            supplied,
            required,
            source: None,
        }
    }

    /// A failed fetch counts as zero bars supplied.
    pub fn data_unavailable(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        required: usize,
        source: DataError,
    ) -> Self {
        Self::InsufficientData {
            symbol: symbol.into(),
            timeframe,
            supplied: 0,
            required,
            source: Some(source),
        }
    }

    pub fn invalid_parameter(name: &'static str, value: f64, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason: reason.into(),
        }
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
