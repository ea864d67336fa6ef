// =============================================================================
// Shared types used across the signal pipeline
// =============================================================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::signals::binner::DeltaBin;

/// A single trade snapshot as delivered by the tick source.
///
/// `volume` and `turnover` are cumulative counters that only reset at the
/// start of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub instrument_id: String,
    /// Exchange-local wall clock.
    pub exchange_time: NaiveDateTime,
    pub last_price: f64,
    pub volume: u64,
    pub turnover: f64,
}

/// One fixed-frequency slot produced by the resampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledBar {
    /// Slot label (left edge of the slot).
    pub timestamp: NaiveDateTime,
    pub instrument_id: String,
    /// `exchange_time` of the tick whose values this slot carries.
    pub source_time: NaiveDateTime,
    pub last_price: f64,
    pub volume: u64,
    pub turnover: f64,
    /// Previous slot's cumulative volume. `None` on the first slot.
    pub volume_shift: Option<u64>,
    /// Previous slot's cumulative turnover. `None` on the first slot.
    pub turnover_shift: Option<f64>,
}

impl ResampledBar {
    /// True when no tick landed in this slot and its values were carried
    /// forward from an earlier one.
    pub fn is_carried(&self) -> bool {
        self.source_time < self.timestamp
    }

    pub fn counters(&self) -> IntervalCounters {
        IntervalCounters {
            volume: self.volume,
            turnover: self.turnover,
            volume_shift: self.volume_shift,
            turnover_shift: self.turnover_shift,
        }
    }
}

/// Cumulative counters behind one VWAP interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalCounters {
    pub volume: u64,
    pub turnover: f64,
    pub volume_shift: Option<u64>,
    pub turnover_shift: Option<f64>,
}

/// Realized direction of the last price between two consecutive rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceDirection {
    Up,
    Down,
    Flat,
}

impl PriceDirection {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            Self::Up
        } else if change < 0.0 {
            Self::Down
        } else {
            Self::Flat
        }
    }

    /// Numeric label: +1, -1 or 0.
    pub fn label(self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
            Self::Flat => 0,
        }
    }
}

impl std::fmt::Display for PriceDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Flat => write!(f, "FLAT"),
        }
    }
}

/// One row of the signal series.
///
/// The VWAP engine fills the VWAP family and `counters`; the binner fills the
/// price and bin fields. Every derived value is optional: `None` means
/// undefined, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub timestamp: NaiveDateTime,
    pub trading_day: NaiveDate,
    pub instrument_id: String,
    pub last_price: f64,
    /// Dropped (set to `None`) before rolling-window computations.
    pub counters: Option<IntervalCounters>,
    pub vwap: Option<f64>,
    pub delta_vwap: Option<f64>,
    pub ddelta_vwap: Option<f64>,
    pub price_change: Option<f64>,
    pub direction: Option<PriceDirection>,
    /// `delta_vwap` over its trailing rolling std at this row.
    pub normalized_delta: Option<f64>,
    /// Bin observed `shift_lag` rows earlier, used to predict `direction`.
    pub delta_bin: Option<DeltaBin>,
}

impl SignalRow {
    /// Row carrying only the bar fields; everything derived is undefined.
    pub fn from_bar(bar: &ResampledBar, trading_day: NaiveDate) -> Self {
        Self {
            timestamp: bar.timestamp,
            trading_day,
            instrument_id: bar.instrument_id.clone(),
            last_price: bar.last_price,
            counters: Some(bar.counters()),
            vwap: None,
            delta_vwap: None,
            ddelta_vwap: None,
            price_change: None,
            direction: None,
            normalized_delta: None,
            delta_bin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(slot: &str, source: &str) -> ResampledBar {
        ResampledBar {
            timestamp: slot.parse().unwrap(),
            instrument_id: "ni2001".into(),
            source_time: source.parse().unwrap(),
            last_price: 100.0,
            volume: 10,
            turnover: 1000.0,
            volume_shift: Some(8),
            turnover_shift: Some(800.0),
        }
    }

    #[test]
    fn direction_from_change() {
        assert_eq!(PriceDirection::from_change(0.5), PriceDirection::Up);
        assert_eq!(PriceDirection::from_change(-0.01), PriceDirection::Down);
        assert_eq!(PriceDirection::from_change(0.0), PriceDirection::Flat);
        assert_eq!(PriceDirection::Down.label(), -1);
    }

    #[test]
    fn carried_bar_detection() {
        assert!(bar("2019-11-04T09:00:10", "2019-11-04T09:00:05").is_carried());
        assert!(!bar("2019-11-04T09:00:10", "2019-11-04T09:00:12").is_carried());
    }

    #[test]
    fn row_from_bar_starts_undefined() {
        let b = bar("2019-11-04T09:00:10", "2019-11-04T09:00:12");
        let row = SignalRow::from_bar(&b, b.timestamp.date());
        assert_eq!(row.counters.unwrap().volume_shift, Some(8));
        assert!(row.vwap.is_none());
        assert!(row.delta_bin.is_none());
    }
}
