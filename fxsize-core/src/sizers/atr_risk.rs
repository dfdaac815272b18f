//! ATR Risk Sizer
//!
//! Position size based on volatility (ATR) and fixed risk per trade.
//! Classic risk management: risk X% of equity per trade, with stop at Y * ATR.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{ContractSpec, Timeframe};
use crate::error::SizingError;
use crate::indicators::AtrResult;
use crate::sizers::{RiskParameters, StopLoss};

/// Which horizon an ATR value describes relative to the target timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtrBasis {
    /// A daily ATR that must be scaled down by the timeframe factor.
    Daily,
    /// Already computed on the target timeframe's bars; used as-is.
    Native,
}

/// Everything that went into a sizing decision, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingInputs {
    pub atr: f64,
    pub basis: AtrBasis,
    pub timeframe: Timeframe,
    /// Factor applied to `atr` (1.0 for a native ATR).
    pub timeframe_factor: f64,
    pub risk: RiskParameters,
    pub contract: ContractSpec,
}

/// Recommended trade size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    /// Base-currency units. Never negative.
    pub units: f64,
    /// `units / contract.units_per_lot`.
    pub lots: f64,
    pub risk_amount: f64,
    pub stop_distance: f64,
    /// Stop distance in pips. `None` when the contract has no usable pip size.
    pub stop_pips: Option<f64>,
    pub scaled_atr: f64,
    /// `lots` is above `contract.max_lots`. The size is reported untruncated.
    pub exceeds_max_lots: bool,
    pub inputs: SizingInputs,
}

/// Size a position from an ATR value and a risk budget.
///
/// # Formula
/// ```text
/// scaled_atr    = atr * factor(timeframe)      (Daily basis only)
/// stop_distance = multiple * scaled_atr | absolute | pips * pip_size
/// risk_amount   = equity * risk_percent / 100
/// units         = risk_amount / stop_distance
/// lots          = units / units_per_lot
/// ```
///
/// # Example
/// - Equity: 10,000, risk 1% (100)
/// - ATR: 0.00105, stop at 2 x ATR = 0.0021
/// - Units: 100 / 0.0021 ≈ 47,619, lots ≈ 0.476
pub fn compute_position_size(
    atr: f64,
    basis: AtrBasis,
    timeframe: Timeframe,
    risk: &RiskParameters,
    contract: &ContractSpec,
) -> Result<PositionSize, SizingError> {
    let timeframe_factor = match basis {
        AtrBasis::Daily => timeframe.daily_factor(),
        AtrBasis::Native => 1.0,
    };
    let scaled_atr = atr * timeframe_factor;

    if risk.stop_loss.uses_atr() && (!atr.is_finite() || atr <= 0.0) {
        return Err(SizingError::invalid_parameter(
            "atr",
            atr,
            "must be finite and > 0 for an ATR-multiple stop",
        ));
    }
    let stop_distance = match risk.stop_loss {
        StopLoss::AtrMultiple(multiple) => {
            if !multiple.is_finite() || multiple <= 0.0 {
                return Err(SizingError::invalid_parameter(
                    "atr_multiple",
                    multiple,
                    "must be finite and > 0",
                ));
            }
            multiple * scaled_atr
        }
        StopLoss::Absolute(distance) => distance,
        StopLoss::Pips(pips) => {
            if !pip_size_is_valid(contract) {
                return Err(SizingError::invalid_parameter(
                    "pip_size",
                    contract.pip_size,
                    "must be finite and > 0",
                ));
            }
            pips * contract.pip_size
        }
    };
    if !stop_distance.is_finite() || stop_distance <= 0.0 {
        return Err(SizingError::invalid_parameter(
            "stop_distance",
            stop_distance,
            "must be finite and > 0",
        ));
    }

    let risk_amount = risk.risk_amount()?;

    if !contract.units_per_lot.is_finite() || contract.units_per_lot <= 0.0 {
        return Err(SizingError::invalid_parameter(
            "units_per_lot",
            contract.units_per_lot,
            "must be finite and > 0",
        ));
    }

    let units = risk_amount / stop_distance;
    let lots = units / contract.units_per_lot;
    if !units.is_finite() || !lots.is_finite() {
        return Err(SizingError::invalid_parameter(
            "stop_distance",
            stop_distance,
            "too small: position size is not finite",
        ));
    }

    let exceeds_max_lots = match contract.max_lots {
        Some(max) if lots > max => {
            warn!(lots, max_lots = max, "position size exceeds max lots");
            true
        }
        _ => false,
    };

    debug!(
        %timeframe,
        ?basis,
        atr,
        scaled_atr,
        stop_distance,
        risk_amount,
        units,
        lots,
        "computed position size"
    );

    Ok(PositionSize {
        units,
        lots,
        risk_amount,
        stop_distance,
        stop_pips: pip_size_is_valid(contract).then(|| stop_distance / contract.pip_size),
        scaled_atr,
        exceeds_max_lots,
        inputs: SizingInputs {
            atr,
            basis,
            timeframe,
            timeframe_factor,
            risk: risk.clone(),
            contract: contract.clone(),
        },
    })
}

fn pip_size_is_valid(contract: &ContractSpec) -> bool {
    contract.pip_size.is_finite() && contract.pip_size > 0.0
}

/// Size a position from an estimator result.
///
/// A result on the target timeframe is used as-is; a daily result is scaled
/// by the target's factor. Any other pairing is rejected.
pub fn size_from_atr(
    atr: &AtrResult,
    target: Timeframe,
    risk: &RiskParameters,
    contract: &ContractSpec,
) -> Result<PositionSize, SizingError> {
    let basis = if atr.timeframe == target {
        AtrBasis::Native
    } else if atr.timeframe == Timeframe::D1 {
        AtrBasis::Daily
    } else {
        return Err(SizingError::invalid_parameter(
            "timeframe",
            atr.timeframe.minutes() as f64,
            format!(
                "ATR computed on {} cannot be applied to {target}; use {target} or 1d bars",
                atr.timeframe
            ),
        ));
    };
    compute_position_size(atr.value, basis, target, risk, contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, Smoothing};
    use chrono::Utc;

    fn eurusd_risk() -> RiskParameters {
        RiskParameters::new(10_000.0, 1.0, StopLoss::AtrMultiple(2.0))
    }

    fn atr_result(timeframe: Timeframe, value: f64) -> AtrResult {
        AtrResult {
            symbol: "EURUSD".into(),
            timeframe,
            periods: 14,
            smoothing: Smoothing::Simple,
            value,
            bars_used: 15,
            true_ranges_discarded: 0,
            forming_bars_excluded: 0,
            last_bar_timestamp: Utc::now(),
        }
    }

    #[test]
    fn eurusd_two_atr_stop() {
        let size = compute_position_size(
            0.00105,
            AtrBasis::Native,
            Timeframe::H1,
            &eurusd_risk(),
            &ContractSpec::standard_lot(),
        )
        .unwrap();

        assert_approx(size.risk_amount, 100.0, 1e-9);
        assert_approx(size.stop_distance, 0.0021, 1e-12);
        assert_approx(size.units, 47_619.047_619, 1e-3);
        assert_approx(size.lots, 0.476_190_476, 1e-8);
        assert_approx(size.stop_pips.unwrap(), 21.0, 1e-9);
        assert!(!size.exceeds_max_lots);
        assert_eq!(size.inputs.timeframe_factor, 1.0);
    }

    #[test]
    fn daily_basis_scales_by_timeframe_factor() {
        let size = compute_position_size(
            0.00120,
            AtrBasis::Daily,
            Timeframe::H1,
            &eurusd_risk(),
            &ContractSpec::standard_lot(),
        )
        .unwrap();
        assert_approx(size.scaled_atr, 0.00120 * 0.45, 1e-15);
        assert_approx(size.stop_distance, 2.0 * 0.00054, 1e-15);
        assert_eq!(size.inputs.timeframe_factor, 0.45);
    }

    #[test]
    fn absolute_and_pip_stops_ignore_atr() {
        let contract = ContractSpec::standard_lot();
        let abs = RiskParameters::new(10_000.0, 1.0, StopLoss::Absolute(0.0020));
        let pips = RiskParameters::new(10_000.0, 1.0, StopLoss::Pips(20.0));

        let a = compute_position_size(f64::NAN, AtrBasis::Native, Timeframe::H1, &abs, &contract)
            .unwrap();
        let p = compute_position_size(0.001, AtrBasis::Native, Timeframe::H1, &pips, &contract)
            .unwrap();
        assert_approx(a.units, 50_000.0, 1e-6);
        assert_approx(p.units, a.units, 1e-6);
    }

    #[test]
    fn zero_equity_is_invalid_parameter() {
        let risk = RiskParameters::new(0.0, 1.0, StopLoss::AtrMultiple(2.0));
        let err = compute_position_size(
            0.001,
            AtrBasis::Native,
            Timeframe::H1,
            &risk,
            &ContractSpec::standard_lot(),
        )
        .unwrap_err();
        assert!(matches!(err, SizingError::InvalidParameter { name: "account_equity", .. }));
    }

    #[test]
    fn non_positive_stop_rejected() {
        let contract = ContractSpec::standard_lot();
        for stop in [
            StopLoss::AtrMultiple(0.0),
            StopLoss::Absolute(0.0),
            StopLoss::Absolute(-0.001),
            StopLoss::Pips(-5.0),
        ] {
            let risk = RiskParameters::new(10_000.0, 1.0, stop);
            let res =
                compute_position_size(0.001, AtrBasis::Native, Timeframe::H1, &risk, &contract);
            assert!(
                matches!(res, Err(SizingError::InvalidParameter { .. })),
                "{stop:?} accepted"
            );
        }
    }

    #[test]
    fn atr_multiple_needs_positive_atr() {
        let err = compute_position_size(
            0.0,
            AtrBasis::Native,
            Timeframe::H1,
            &eurusd_risk(),
            &ContractSpec::standard_lot(),
        )
        .unwrap_err();
        assert!(matches!(err, SizingError::InvalidParameter { name: "atr", .. }));
    }

    #[test]
    fn zero_units_per_lot_rejected() {
        let contract = ContractSpec::new(0.0, 0.0001);
        let err = compute_position_size(
            0.001,
            AtrBasis::Native,
            Timeframe::H1,
            &eurusd_risk(),
            &contract,
        )
        .unwrap_err();
        assert!(matches!(err, SizingError::InvalidParameter { name: "units_per_lot", .. }));
    }

    #[test]
    fn subnormal_stop_is_rejected_not_infinite() {
        let risk = RiskParameters::new(10_000.0, 1.0, StopLoss::Absolute(1e-310));
        let err = compute_position_size(
            0.001,
            AtrBasis::Native,
            Timeframe::H1,
            &risk,
            &ContractSpec::standard_lot(),
        )
        .unwrap_err();
        assert!(matches!(err, SizingError::InvalidParameter { name: "stop_distance", .. }));
    }

    #[test]
    fn pip_size_only_checked_for_pip_stops() {
        let contract = ContractSpec::new(100_000.0, 0.0);

        let size = compute_position_size(
            0.00105,
            AtrBasis::Native,
            Timeframe::H1,
            &eurusd_risk(),
            &contract,
        )
        .unwrap();
        assert_approx(size.units, 47_619.047_619, 1e-3);
        assert_eq!(size.stop_pips, None);

        let pips = RiskParameters::new(10_000.0, 1.0, StopLoss::Pips(20.0));
        let err = compute_position_size(0.00105, AtrBasis::Native, Timeframe::H1, &pips, &contract)
            .unwrap_err();
        assert!(matches!(err, SizingError::InvalidParameter { name: "pip_size", .. }));
    }

    #[test]
    fn exceeding_max_lots_flags_without_truncating() {
        let contract = ContractSpec::standard_lot().with_max_lots(0.25);
        let size = compute_position_size(
            0.00105,
            AtrBasis::Native,
            Timeframe::H1,
            &eurusd_risk(),
            &contract,
        )
        .unwrap();
        assert!(size.exceeds_max_lots);
        assert_approx(size.lots, 0.476_190_476, 1e-8);
    }

    #[test]
    fn size_from_native_atr() {
        let atr = atr_result(Timeframe::H4, 0.002);
        let size = size_from_atr(&atr, Timeframe::H4, &eurusd_risk(), &ContractSpec::standard_lot())
            .unwrap();
        assert_eq!(size.inputs.basis, AtrBasis::Native);
        assert_approx(size.stop_distance, 0.004, 1e-15);
    }

    #[test]
    fn size_from_daily_atr_scales() {
        let atr = atr_result(Timeframe::D1, 0.002);
        let size = size_from_atr(&atr, Timeframe::H4, &eurusd_risk(), &ContractSpec::standard_lot())
            .unwrap();
        assert_eq!(size.inputs.basis, AtrBasis::Daily);
        assert_approx(size.scaled_atr, 0.002 * 0.67, 1e-15);
    }

    #[test]
    fn size_from_mismatched_intraday_atr_rejected() {
        let atr = atr_result(Timeframe::M15, 0.0005);
        let err = size_from_atr(&atr, Timeframe::H1, &eurusd_risk(), &ContractSpec::standard_lot())
            .unwrap_err();
        assert!(matches!(err, SizingError::InvalidParameter { name: "timeframe", .. }));
    }
}
