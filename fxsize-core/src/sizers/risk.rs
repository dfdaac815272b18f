//! Account risk inputs.

use serde::{Deserialize, Serialize};

use crate::error::SizingError;

/// How far away the protective stop sits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StopLoss {
    /// Multiple of the (scaled) ATR, e.g. 2.0 = stop at 2 x ATR.
    AtrMultiple(f64),
    /// Absolute price distance.
    Absolute(f64),
    /// Distance in pips, converted with the contract's pip size.
    Pips(f64),
}

impl StopLoss {
    pub fn uses_atr(&self) -> bool {
        matches!(self, Self::AtrMultiple(_))
    }
}

/// Account-level risk tolerance for one trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Account equity in account currency.
    pub account_equity: f64,
    /// Percent of equity put at risk, e.g. 1.0 = 1%.
    pub risk_percent: f64,
    pub stop_loss: StopLoss,
}

impl RiskParameters {
    pub fn new(account_equity: f64, risk_percent: f64, stop_loss: StopLoss) -> Self {
        Self {
            account_equity,
            risk_percent,
            stop_loss,
        }
    }

    /// Reject equity <= 0, risk outside (0, 100], and non-finite inputs.
    pub fn validate(&self) -> Result<(), SizingError> {
        if !self.account_equity.is_finite() || self.account_equity <= 0.0 {
            return Err(SizingError::invalid_parameter(
                "account_equity",
                self.account_equity,
                "must be finite and > 0",
            ));
        }
        if !self.risk_percent.is_finite() || self.risk_percent <= 0.0 || self.risk_percent > 100.0
        {
            return Err(SizingError::invalid_parameter(
                "risk_percent",
                self.risk_percent,
                "must be in (0, 100]",
            ));
        }
        Ok(())
    }

    /// Account currency put at risk: equity * risk% / 100.
    pub fn risk_amount(&self) -> Result<f64, SizingError> {
        self.validate()?;
        Ok(self.account_equity * (self.risk_percent / 100.0))
    }
}
