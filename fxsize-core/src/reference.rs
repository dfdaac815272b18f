//! Static per-symbol reference data.
//!
//! Default daily ATR values are a fallback for when live bars are
//! unavailable. The table is compiled in and never mutated.

use serde::Serialize;

/// Reference data for one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SymbolReference {
    pub symbol: &'static str,
    /// Typical daily ATR in price units.
    pub default_daily_atr: f64,
    pub pip_size: f64,
}

const fn entry(symbol: &'static str, default_daily_atr: f64, pip_size: f64) -> SymbolReference {
    SymbolReference {
        symbol,
        default_daily_atr,
        pip_size,
    }
}

pub static SYMBOL_TABLE: [SymbolReference; 14] = [
    entry("EURUSD", 0.00120, 0.0001),
    entry("GBPUSD", 0.00165, 0.0001),
    entry("USDJPY", 1.420, 0.01),
    entry("AUDUSD", 0.00105, 0.0001),
    entry("USDCAD", 0.00125, 0.0001),
    entry("USDCHF", 0.00115, 0.0001),
    entry("NZDUSD", 0.00095, 0.0001),
    entry("EURJPY", 1.650, 0.01),
    entry("GBPJPY", 2.150, 0.01),
    entry("EURGBP", 0.00085, 0.0001),
    entry("AUDJPY", 1.250, 0.01),
    entry("EURAUD", 0.00180, 0.0001),
    entry("GBPAUD", 0.00225, 0.0001),
    entry("XAUUSD", 30.00, 0.01),
];

/// Canonical form of a symbol: uppercase, separators removed (`eur/usd` -> `EURUSD`).
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub fn lookup(symbol: &str) -> Option<&'static SymbolReference> {
    let key = normalize_symbol(symbol);
    SYMBOL_TABLE.iter().find(|r| r.symbol == key)
}

/// Default daily ATR for `symbol`, if the table knows it.
pub fn default_daily_atr(symbol: &str) -> Option<f64> {
    lookup(symbol).map(|r| r.default_daily_atr)
}
