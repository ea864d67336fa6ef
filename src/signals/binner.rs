// =============================================================================
// Signal Binner — normalized VWAP delta buckets vs realized price direction
// =============================================================================
//
// For each row:
//   normalized_delta = delta_vwap / sample_std(delta_vwap over `lookback` rows)
//   delta_bin        = floor(normalized_delta) for values in [-5, 5)
//
// The bin is then shifted forward by `shift_lag` rows, so a row pairs the
// bin observed `shift_lag` rows earlier with its own price direction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SignalError};
use crate::indicators::rolling::{diff, rolling_std, shift};
use crate::types::{PriceDirection, SignalRow};

const BIN_MIN: i8 = -5;
const BIN_MAX: i8 = 4;

/// One of the ten unit-width buckets `[lower, lower + 1)` covering `[-5, 5)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub struct DeltaBin(i8);

impl DeltaBin {
    /// Bucket of a normalized delta; `None` outside `[-5, 5)` or for NaN.
    pub fn classify(value: f64) -> Option<Self> {
        if value.is_finite() && value >= f64::from(BIN_MIN) && value < f64::from(BIN_MAX + 1) {
            Some(Self(value.floor() as i8))
        } else {
            None
        }
    }

    /// All ten bins, most negative first.
    pub fn all() -> impl Iterator<Item = Self> {
        (BIN_MIN..=BIN_MAX).map(Self)
    }

    pub fn lower(self) -> i8 {
        self.0
    }

    pub fn upper(self) -> i8 {
        self.0 + 1
    }

    /// Display label, e.g. `(-)2to1` for `[-2, -1)` and `(+)0to1` for `[0, 1)`.
    pub fn label(self) -> String {
        if self.lower() < 0 {
            format!("(-){}to{}", -self.lower(), -self.upper())
        } else {
            format!("(+){}to{}", self.lower(), self.upper())
        }
    }
}

impl TryFrom<i8> for DeltaBin {
    type Error = SignalError;

    fn try_from(lower: i8) -> Result<Self> {
        if (BIN_MIN..=BIN_MAX).contains(&lower) {
            Ok(Self(lower))
        } else {
            Err(SignalError::InvalidInput(format!(
                "bin lower bound {lower} outside [{BIN_MIN}, {BIN_MAX}]"
            )))
        }
    }
}

impl From<DeltaBin> for i8 {
    fn from(bin: DeltaBin) -> Self {
        bin.0
    }
}

impl std::fmt::Display for DeltaBin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

// =============================================================================
// Binning
// =============================================================================

fn check_lookback(lookback: usize) -> Result<()> {
    if lookback < 2 {
        return Err(SignalError::InvalidInput(format!(
            "lookback must be at least 2 for a sample deviation, got {lookback}"
        )));
    }
    Ok(())
}

/// Fill the price and bin fields of `series`, treating it as one contiguous
/// sequence: the rolling window, the price change and the bin shift all run
/// across whatever day boundaries the series contains.
pub fn bin_signal(
    mut series: Vec<SignalRow>,
    lookback: usize,
    shift_lag: usize,
) -> Result<Vec<SignalRow>> {
    check_lookback(lookback)?;

    let deltas: Vec<Option<f64>> = series.iter().map(|r| r.delta_vwap).collect();
    let stds = rolling_std(&deltas, lookback);

    let normalized: Vec<Option<f64>> = deltas
        .iter()
        .zip(&stds)
        .map(|(delta, std_dev)| match (delta, std_dev) {
            (Some(d), Some(s)) if *s != 0.0 => Some(d / s).filter(|v| v.is_finite()),
            _ => None,
        })
        .collect();

    let prices: Vec<Option<f64>> = series.iter().map(|r| Some(r.last_price)).collect();
    let changes = diff(&prices);

    let bins: Vec<Option<DeltaBin>> = normalized
        .iter()
        .map(|v| v.and_then(DeltaBin::classify))
        .collect();
    let shifted = shift(&bins, shift_lag);

    for (i, row) in series.iter_mut().enumerate() {
        row.normalized_delta = normalized[i];
        row.price_change = changes[i];
        row.direction = changes[i].map(PriceDirection::from_change);
        row.delta_bin = shifted[i];
    }

    debug!(
        rows = series.len(),
        binned = series.iter().filter(|r| r.delta_bin.is_some()).count(),
        lookback,
        shift_lag,
        "signal binned"
    );

    Ok(series)
}

/// Same as [`bin_signal`] but restarted for every `(instrument_id,
/// trading_day)` run, so no window or shift crosses a day boundary.
pub fn bin_signal_per_day(
    series: Vec<SignalRow>,
    lookback: usize,
    shift_lag: usize,
) -> Result<Vec<SignalRow>> {
    check_lookback(lookback)?;

    let mut runs: Vec<Vec<SignalRow>> = Vec::new();
    for row in series {
        let same_run = runs.last().and_then(|run| run.last()).is_some_and(|prev| {
            prev.instrument_id == row.instrument_id && prev.trading_day == row.trading_day
        });
        match runs.last_mut() {
            Some(run) if same_run => run.push(row),
            _ => runs.push(vec![row]),
        }
    }

    let mut out = Vec::new();
    for run in runs {
        out.extend(bin_signal(run, lookback, shift_lag)?);
    }
    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 11, d).unwrap()
    }

    fn row(trading_day: NaiveDate, i: i64, price: f64, delta: Option<f64>) -> SignalRow {
        let open: NaiveDateTime = trading_day.and_hms_opt(9, 0, 0).unwrap();
        let ts = open + Duration::seconds(i * 10);
        SignalRow {
            timestamp: ts,
            trading_day,
            instrument_id: "ni2001".into(),
            last_price: price,
            counters: None,
            vwap: Some(price),
            delta_vwap: delta,
            ddelta_vwap: None,
            price_change: None,
            direction: None,
            normalized_delta: None,
            delta_bin: None,
        }
    }

    #[test]
    fn classify_edges() {
        assert_eq!(DeltaBin::classify(-5.0).map(DeltaBin::lower), Some(-5));
        assert_eq!(DeltaBin::classify(-0.2).map(DeltaBin::lower), Some(-1));
        assert_eq!(DeltaBin::classify(0.0).map(DeltaBin::lower), Some(0));
        assert_eq!(DeltaBin::classify(4.999).map(DeltaBin::lower), Some(4));
        assert_eq!(DeltaBin::classify(5.0), None);
        assert_eq!(DeltaBin::classify(-5.0001), None);
        assert_eq!(DeltaBin::classify(f64::NAN), None);
    }

    #[test]
    fn labels_in_order() {
        let labels: Vec<String> = DeltaBin::all().map(|b| b.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "(-)5to4", "(-)4to3", "(-)3to2", "(-)2to1", "(-)1to0", "(+)0to1", "(+)1to2",
                "(+)2to3", "(+)3to4", "(+)4to5",
            ]
        );
    }

    #[test]
    fn bin_serde_rejects_out_of_range() {
        let bin: DeltaBin = serde_json::from_str("-3").unwrap();
        assert_eq!(bin.lower(), -3);
        assert_eq!(serde_json::to_string(&bin).unwrap(), "-3");
        assert!(serde_json::from_str::<DeltaBin>("5").is_err());
    }

    #[test]
    fn rejects_short_lookback() {
        let rows = vec![row(day(4), 0, 10.0, Some(1.0))];
        assert!(matches!(bin_signal(rows.clone(), 1, 1), Err(SignalError::InvalidInput(_))));
        assert!(matches!(bin_signal_per_day(rows, 0, 1), Err(SignalError::InvalidInput(_))));
    }

    #[test]
    fn normalizes_bins_and_shifts() {
        let d = day(4);
        let rows = vec![
            row(d, 0, 10.0, None),
            row(d, 1, 11.0, Some(1.0)),
            row(d, 2, 11.0, Some(3.0)),
            row(d, 3, 10.0, Some(2.0)),
            row(d, 4, 10.5, Some(2.0)),
        ];
        let out = bin_signal(rows, 2, 1).unwrap();

        assert_eq!(out[0].normalized_delta, None);
        assert_eq!(out[1].normalized_delta, None);
        // std(1, 3) = sqrt(2); std(3, 2) = sqrt(0.5); std(2, 2) = 0.
        assert!((out[2].normalized_delta.unwrap() - 3.0 / 2f64.sqrt()).abs() < 1e-12);
        assert!((out[3].normalized_delta.unwrap() - 2.0 / 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(out[4].normalized_delta, None);

        let bins: Vec<Option<i8>> = out.iter().map(|r| r.delta_bin.map(DeltaBin::lower)).collect();
        assert_eq!(bins, vec![None, None, None, Some(2), Some(2)]);

        let dirs: Vec<Option<PriceDirection>> = out.iter().map(|r| r.direction).collect();
        assert_eq!(
            dirs,
            vec![
                None,
                Some(PriceDirection::Up),
                Some(PriceDirection::Flat),
                Some(PriceDirection::Down),
                Some(PriceDirection::Up),
            ]
        );
    }

    #[test]
    fn zero_lag_keeps_bin_on_its_row() {
        let d = day(4);
        let rows = vec![
            row(d, 0, 10.0, Some(1.0)),
            row(d, 1, 10.0, Some(-1.0)),
        ];
        let out = bin_signal(rows, 2, 0).unwrap();
        // std(1, -1) = sqrt(2); -1 / sqrt(2) lands in [-1, 0).
        assert_eq!(out[1].delta_bin.map(DeltaBin::lower), Some(-1));
    }

    #[test]
    fn contiguous_and_per_day_agree_away_from_boundaries() {
        let deltas = [0.5, -1.0, 2.0, 0.25, -0.75, 1.5];
        let mut rows = Vec::new();
        for (d, offset) in [(day(4), 0.0), (day(5), 0.1)] {
            for (i, delta) in deltas.iter().enumerate() {
                rows.push(row(d, i as i64, 100.0 + i as f64, Some(delta + offset)));
            }
        }

        let lookback = 3;
        let contiguous = bin_signal(rows.clone(), lookback, 1).unwrap();
        let per_day = bin_signal_per_day(rows, lookback, 1).unwrap();
        assert_eq!(contiguous.len(), per_day.len());

        for (i, (c, p)) in contiguous.iter().zip(&per_day).enumerate() {
            let pos_in_day = i % deltas.len();
            if pos_in_day >= lookback - 1 {
                let (c, p) = (c.normalized_delta.unwrap(), p.normalized_delta.unwrap());
                assert!((c - p).abs() < 1e-12, "row {i}");
            } else if i >= deltas.len() {
                // Second day's opening rows: only the contiguous window is full.
                assert!(c.normalized_delta.is_some(), "row {i}");
                assert!(p.normalized_delta.is_none(), "row {i}");
            }
        }

        // Each day restarts the price change and the bin shift.
        let second_open = &per_day[deltas.len()];
        assert_eq!(second_open.direction, None);
        assert_eq!(second_open.delta_bin, None);
        assert_eq!(contiguous[deltas.len()].direction, Some(PriceDirection::Down));
    }
}
