//! Fetch → ATR → size orchestration.
//!
//! `Calculator` is the caller-side glue around the pure estimator and sizer.
//! It owns a provider and an explicit config; there is no process-wide
//! state. Fallback to reference data is a policy chosen here, never inside
//! the estimator.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data::BarProvider;
use crate::domain::{ContractSpec, Timeframe};
use crate::error::SizingError;
use crate::indicators::{compute_atr, AtrParams, AtrResult};
use crate::reference;
use crate::sizers::{compute_position_size, AtrBasis, PositionSize, RiskParameters};

/// What to do when live bars cannot produce an ATR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Surface the error.
    #[default]
    None,
    /// On insufficient data, use the symbol's default daily ATR scaled to the
    /// timeframe. Invalid results and parameters are never masked.
    DefaultTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorConfig {
    pub atr: AtrParams,
    pub fallback: FallbackPolicy,
    /// Bars requested beyond the minimum, as headroom for malformed bars.
    pub extra_bars: usize,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            atr: AtrParams::default(),
            fallback: FallbackPolicy::None,
            extra_bars: 5,
        }
    }
}

/// Where the ATR used for sizing came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AtrSource {
    Live { provider: String },
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtrEstimate {
    pub value: f64,
    pub basis: AtrBasis,
    pub source: AtrSource,
    /// Present for live estimates.
    pub result: Option<AtrResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingOutcome {
    pub symbol: String,
    pub atr: AtrEstimate,
    pub position: PositionSize,
}

pub struct Calculator<P> {
    provider: P,
    config: CalculatorConfig,
}

impl<P: BarProvider> Calculator<P> {
    pub fn new(provider: P, config: CalculatorConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &CalculatorConfig {
        &self.config
    }

    /// periods + 1 closed bars, plus headroom and a slot for a forming bar.
    pub fn bars_to_request(&self) -> usize {
        let forming_slot = usize::from(!self.config.atr.include_forming_bar);
        self.config
            .atr
            .required_bars()
            .saturating_add(self.config.extra_bars)
            .saturating_add(forming_slot)
    }

    /// Fetch bars and compute a live ATR on `timeframe`.
    pub fn atr_for(&self, symbol: &str, timeframe: Timeframe) -> Result<AtrResult, SizingError> {
        let count = self.bars_to_request();
        let series = self
            .provider
            .fetch_bars(symbol, timeframe, count)
            .map_err(|e| {
                warn!(
                    provider = self.provider.name(),
                    symbol,
                    %timeframe,
                    error = %e,
                    "bar fetch failed"
                );
                SizingError::data_unavailable(
                    symbol,
                    timeframe,
                    self.config.atr.required_bars(),
                    e,
                )
            })?;
        compute_atr(&series, &self.config.atr)
    }

    /// Live ATR, or the reference default when policy allows.
    pub fn estimate_atr(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<AtrEstimate, SizingError> {
        match self.atr_for(symbol, timeframe) {
            Ok(result) => Ok(AtrEstimate {
                value: result.value,
                basis: AtrBasis::Native,
                source: AtrSource::Live {
                    provider: self.provider.name().to_string(),
                },
                result: Some(result),
            }),
            Err(err)
                if err.is_insufficient_data()
                    && self.config.fallback == FallbackPolicy::DefaultTable =>
            {
                let Some(daily) = reference::default_daily_atr(symbol) else {
                    return Err(err);
                };
                warn!(symbol, %timeframe, daily_atr = daily, error = %err, "using default daily ATR");
                Ok(AtrEstimate {
                    value: daily,
                    basis: AtrBasis::Daily,
                    source: AtrSource::Fallback {
                        reason: err.to_string(),
                    },
                    result: None,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Full pipeline: ATR estimate, then position size.
    pub fn size_for(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        risk: &RiskParameters,
        contract: &ContractSpec,
    ) -> Result<SizingOutcome, SizingError> {
        let atr = self.estimate_atr(symbol, timeframe)?;
        let position = compute_position_size(atr.value, atr.basis, timeframe, risk, contract)?;
        info!(
            symbol,
            %timeframe,
            atr = atr.value,
            units = position.units,
            lots = position.lots,
            "sized position"
        );
        Ok(SizingOutcome {
            symbol: reference::normalize_symbol(symbol),
            atr,
            position,
        })
    }
}
