// =============================================================================
// VWAP Engine — interval VWAP and its first / second differences
// =============================================================================
//
// For a bar with cumulative counters (V, T) and the previous slot's (V', T'):
//
//   vwap        = (T - T') / (V - V')         undefined when V == V'
//   delta_vwap  = vwap[t] - vwap[t-1]
//   ddelta_vwap = delta_vwap[t] - delta_vwap[t-1]
//
// Undefined VWAPs are forward filled before differencing.  Rounding is the
// last step, so differences are always taken on unrounded values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SignalError};
use crate::indicators::rolling::{diff, forward_fill, round_to};
use crate::types::{ResampledBar, SignalRow};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VwapConfig {
    /// Decimal places of the published VWAP family. `None` keeps full precision.
    pub decimals: Option<u32>,
    /// When set, raw VWAP is divided by this contract multiplier.
    pub multiplier: Option<f64>,
}

impl Default for VwapConfig {
    fn default() -> Self {
        Self {
            decimals: Some(2),
            multiplier: None,
        }
    }
}

/// VWAP of one interval from cumulative counters.
fn interval_vwap(bar: &ResampledBar) -> Option<f64> {
    let (volume_shift, turnover_shift) = (bar.volume_shift?, bar.turnover_shift?);
    let traded = bar.volume as f64 - volume_shift as f64;
    if traded == 0.0 {
        return None;
    }
    Some((bar.turnover - turnover_shift) / traded).filter(|v| v.is_finite())
}

/// Build the signal rows of one trading day from its (already filtered) bars.
pub fn compute_vwap(
    bars: &[ResampledBar],
    trading_day: NaiveDate,
    config: &VwapConfig,
) -> Result<Vec<SignalRow>> {
    if let Some(m) = config.multiplier {
        if !(m.is_finite() && m > 0.0) {
            return Err(SignalError::InvalidInput(format!(
                "contract multiplier must be positive, got {m}"
            )));
        }
    }

    let raw: Vec<Option<f64>> = bars
        .iter()
        .map(|bar| {
            let vwap = interval_vwap(bar)?;
            Some(match config.multiplier {
                Some(m) => vwap / m,
                None => vwap,
            })
        })
        .collect();

    let vwap = forward_fill(&raw);
    let delta = diff(&vwap);
    let ddelta = diff(&delta);

    let publish = |v: Option<f64>| match config.decimals {
        Some(places) => v.map(|x| round_to(x, places)),
        None => v,
    };

    let rows: Vec<SignalRow> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let mut row = SignalRow::from_bar(bar, trading_day);
            row.vwap = publish(vwap[i]);
            row.delta_vwap = publish(delta[i]);
            row.ddelta_vwap = publish(ddelta[i]);
            row
        })
        .collect();

    debug!(
        %trading_day,
        rows = rows.len(),
        undefined_intervals = raw.iter().filter(|v| v.is_none()).count(),
        "vwap computed"
    );

    Ok(rows)
}
