//! Position Sizers: turn a volatility estimate and a risk budget into a trade size
//!
//! Sizers are pure: they take an ATR value, risk parameters and contract
//! conventions and return units and lots. They never fetch data and never
//! round to broker increments; both are the caller's job.

pub mod atr_risk;
pub mod risk;

pub use atr_risk::{compute_position_size, size_from_atr, AtrBasis, PositionSize, SizingInputs};
pub use risk::{RiskParameters, StopLoss};
