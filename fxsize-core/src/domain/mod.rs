//! Domain types for fxsize

pub mod bar;
pub mod contract;
pub mod timeframe;

pub use bar::{Bar, BarSeries};
pub use contract::ContractSpec;
pub use timeframe::{Timeframe, TimeframeParseError};
