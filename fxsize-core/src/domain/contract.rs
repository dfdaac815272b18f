//! Contract conventions used to turn units into lots.

use serde::{Deserialize, Serialize};

use crate::reference;

/// Units per standard forex lot.
pub const STANDARD_LOT_UNITS: f64 = 100_000.0;

/// Contract sizing conventions for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSpec {
    /// Base-currency units in one lot.
    pub units_per_lot: f64,
    /// Price increment of one pip.
    pub pip_size: f64,
    /// Broker/margin ceiling on lots. Exceeding it flags the result.
    #[serde(default)]
    pub max_lots: Option<f64>,
}

impl ContractSpec {
    pub fn new(units_per_lot: f64, pip_size: f64) -> Self {
        Self {
            units_per_lot,
            pip_size,
            max_lots: None,
        }
    }

    /// Standard lot (100,000 units) with a 4-decimal pip.
    pub fn standard_lot() -> Self {
        Self::new(STANDARD_LOT_UNITS, 0.0001)
    }

    /// Standard lot with the pip size from the symbol reference table.
    /// Unknown symbols get the 4-decimal default.
    pub fn for_symbol(symbol: &str) -> Self {
        let pip_size = reference::lookup(symbol)
            .map(|r| r.pip_size)
            .unwrap_or(0.0001);
        Self::new(STANDARD_LOT_UNITS, pip_size)
    }

    pub fn with_max_lots(mut self, max_lots: f64) -> Self {
        self.max_lots = Some(max_lots);
        self
    }
}

impl Default for ContractSpec {
    fn default() -> Self {
        Self::standard_lot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpy_pairs_use_two_decimal_pips() {
        assert_eq!(ContractSpec::for_symbol("USDJPY").pip_size, 0.01);
        assert_eq!(ContractSpec::for_symbol("EURUSD").pip_size, 0.0001);
    }

    #[test]
    fn unknown_symbol_defaults() {
        let spec = ContractSpec::for_symbol("ZZZZZZ");
        assert_eq!(spec, ContractSpec::standard_lot());
    }

    #[test]
    fn max_lots_builder() {
        let spec = ContractSpec::standard_lot().with_max_lots(5.0);
        assert_eq!(spec.max_lots, Some(5.0));
    }
}
