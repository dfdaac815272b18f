//! Bar timeframes and their share of daily volatility.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported bar intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "8h")]
    H8,
    #[serde(rename = "1d")]
    D1,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown timeframe '{0}' (expected one of 1m, 5m, 15m, 30m, 1h, 4h, 8h, 1d)")]
pub struct TimeframeParseError(pub String);

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::H8,
        Timeframe::D1,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::H8 => "8h",
            Self::D1 => "1d",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            Self::M1 => 1,
            Self::M5 => 5,
            Self::M15 => 15,
            Self::M30 => 30,
            Self::H1 => 60,
            Self::H4 => 240,
            Self::H8 => 480,
            Self::D1 => 1440,
        }
    }

    /// Length of one bar.
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// Approximate fraction of the daily ATR covered by one bar of this
    /// timeframe. Always in (0, 1]; daily is the reference.
    pub fn daily_factor(&self) -> f64 {
        match self {
            Self::M1 => 0.05,
            Self::M5 => 0.12,
            Self::M15 => 0.22,
            Self::M30 => 0.32,
            Self::H1 => 0.45,
            Self::H4 => 0.67,
            Self::H8 => 0.82,
            Self::D1 => 1.0,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let tf = match normalized.as_str() {
            "1m" | "m1" => Self::M1,
            "5m" | "m5" => Self::M5,
            "15m" | "m15" => Self::M15,
            "30m" | "m30" => Self::M30,
            "1h" | "h1" | "60m" => Self::H1,
            "4h" | "h4" => Self::H4,
            "8h" | "h8" => Self::H8,
            "1d" | "d1" | "daily" => Self::D1,
            _ => return Err(TimeframeParseError(s.to_string())),
        };
        Ok(tf)
    }
}
