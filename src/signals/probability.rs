// =============================================================================
// Probability Estimator — P(direction | lagged delta bin)
// =============================================================================

use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signals::binner::DeltaBin;
use crate::types::{PriceDirection, SignalRow};

/// Empirical direction frequencies for one bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityRow {
    pub bin: DeltaBin,
    /// Rows carrying this bin, including those whose direction is undefined.
    pub observations: usize,
    pub prob_up: Option<f64>,
    pub prob_down: Option<f64>,
    pub prob_flat: Option<f64>,
}

impl ProbabilityRow {
    fn empty(bin: DeltaBin) -> Self {
        Self {
            bin,
            observations: 0,
            prob_up: None,
            prob_down: None,
            prob_flat: None,
        }
    }
}

/// Conditional direction frequencies for every bin, most negative first.
///
/// `prob_flat` is taken as the complement of up and down so the three always
/// sum to exactly 1.0 for a bin with observations.
pub fn estimate(series: &[SignalRow]) -> BTreeMap<DeltaBin, ProbabilityRow> {
    let mut counts: BTreeMap<DeltaBin, (usize, usize, usize)> =
        DeltaBin::all().map(|bin| (bin, (0, 0, 0))).collect();

    for row in series {
        let Some(bin) = row.delta_bin else { continue };
        let entry = counts.entry(bin).or_default();
        entry.0 += 1;
        match row.direction {
            Some(PriceDirection::Up) => entry.1 += 1,
            Some(PriceDirection::Down) => entry.2 += 1,
            _ => {}
        }
    }

    counts
        .into_iter()
        .map(|(bin, (total, up, down))| {
            if total == 0 {
                return (bin, ProbabilityRow::empty(bin));
            }
            let prob_up = up as f64 / total as f64;
            let prob_down = down as f64 / total as f64;
            let row = ProbabilityRow {
                bin,
                observations: total,
                prob_up: Some(prob_up),
                prob_down: Some(prob_down),
                prob_flat: Some(1.0 - (prob_up + prob_down)),
            };
            (bin, row)
        })
        .collect()
}

// =============================================================================
// ProbabilityTable
// =============================================================================

/// Estimator output for one instrument at one frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityTable {
    pub run_id: Uuid,
    pub instrument_id: String,
    pub frequency_secs: i64,
    pub rows: Vec<ProbabilityRow>,
}

impl ProbabilityTable {
    pub fn new(
        run_id: Uuid,
        instrument_id: impl Into<String>,
        frequency: Duration,
        estimates: BTreeMap<DeltaBin, ProbabilityRow>,
    ) -> Self {
        Self {
            run_id,
            instrument_id: instrument_id.into(),
            frequency_secs: frequency.num_seconds(),
            rows: estimates.into_values().collect(),
        }
    }

    pub fn observations(&self) -> usize {
        self.rows.iter().map(|r| r.observations).sum()
    }

    pub fn row(&self, bin: DeltaBin) -> Option<&ProbabilityRow> {
        self.rows.iter().find(|r| r.bin == bin)
    }
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "nan".to_string(),
    }
}

impl fmt::Display for ProbabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} @ {}s  (run {})",
            self.instrument_id, self.frequency_secs, self.run_id
        )?;
        writeln!(f, "{:<9} {:>7} {:>7} {:>7} {:>7}", "bin", "obs", "up", "down", "flat")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<9} {:>7} {:>7} {:>7} {:>7}",
                row.bin.label(),
                row.observations,
                cell(row.prob_up),
                cell(row.prob_down),
                cell(row.prob_flat)
            )?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn labelled(bin: Option<i8>, direction: Option<PriceDirection>) -> SignalRow {
        let day = NaiveDate::from_ymd_opt(2019, 11, 4).unwrap();
        SignalRow {
            timestamp: day.and_hms_opt(9, 0, 0).unwrap(),
            trading_day: day,
            instrument_id: "ni2001".into(),
            last_price: 100.0,
            counters: None,
            vwap: Some(100.0),
            delta_vwap: Some(0.0),
            ddelta_vwap: None,
            price_change: None,
            direction,
            normalized_delta: None,
            delta_bin: bin.map(|b| DeltaBin::try_from(b).unwrap()),
        }
    }

    fn bin(b: i8) -> DeltaBin {
        DeltaBin::try_from(b).unwrap()
    }

    #[test]
    fn covers_all_bins_and_empty_ones_are_undefined() {
        let table = estimate(&[labelled(Some(0), Some(PriceDirection::Up))]);
        assert_eq!(table.len(), 10);
        let empty = &table[&bin(-5)];
        assert_eq!(empty.observations, 0);
        assert_eq!(empty.prob_up, None);
        assert_eq!(empty.prob_down, None);
        assert_eq!(empty.prob_flat, None);
    }

    #[test]
    fn frequencies_per_bin() {
        use PriceDirection::*;
        let rows = vec![
            labelled(Some(1), Some(Up)),
            labelled(Some(1), Some(Up)),
            labelled(Some(1), Some(Down)),
            labelled(Some(1), Some(Flat)),
            labelled(Some(-2), Some(Down)),
            labelled(None, Some(Up)),
        ];
        let table = estimate(&rows);

        let plus = &table[&bin(1)];
        assert_eq!(plus.observations, 4);
        assert_eq!(plus.prob_up, Some(0.5));
        assert_eq!(plus.prob_down, Some(0.25));
        assert_eq!(plus.prob_flat, Some(0.25));

        let minus = &table[&bin(-2)];
        assert_eq!(minus.prob_down, Some(1.0));
        assert_eq!(minus.prob_flat, Some(0.0));

        let total: usize = table.values().map(|r| r.observations).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn undefined_direction_counts_toward_total_only() {
        let rows = vec![
            labelled(Some(3), Some(PriceDirection::Up)),
            labelled(Some(3), None),
        ];
        let row = &estimate(&rows)[&bin(3)];
        assert_eq!(row.observations, 2);
        assert_eq!(row.prob_up, Some(0.5));
        assert_eq!(row.prob_down, Some(0.0));
        assert_eq!(row.prob_flat, Some(0.5));
    }

    #[test]
    fn probabilities_sum_to_exactly_one() {
        use PriceDirection::*;
        // Thirds and sevenths do not add up cleanly in binary.
        let mut rows = Vec::new();
        for (i, dir) in [Up, Down, Flat, Up, Down, Up, Flat].iter().enumerate() {
            rows.push(labelled(Some(0), Some(*dir)));
            if i < 3 {
                rows.push(labelled(Some(-1), Some(*dir)));
            }
        }
        for row in estimate(&rows).values().filter(|r| r.observations > 0) {
            let sum = row.prob_up.unwrap() + row.prob_down.unwrap() + row.prob_flat.unwrap();
            assert_eq!(sum, 1.0, "{}", row.bin);
        }
    }

    #[test]
    fn table_renders_three_decimals_and_nan() {
        let rows = vec![
            labelled(Some(0), Some(PriceDirection::Up)),
            labelled(Some(0), Some(PriceDirection::Down)),
            labelled(Some(0), Some(PriceDirection::Down)),
        ];
        let table = ProbabilityTable::new(
            Uuid::nil(),
            "ni2001",
            Duration::seconds(10),
            estimate(&rows),
        );
        assert_eq!(table.rows.len(), 10);
        assert_eq!(table.observations(), 3);
        let zero = table.row(bin(0)).unwrap();
        assert_eq!(zero.observations, 3);
        assert_eq!(zero.prob_flat, Some(0.0));
        assert_eq!(table.row(bin(4)).unwrap().prob_up, None);

        let text = table.to_string();
        assert!(text.starts_with("ni2001 @ 10s"));
        let zero_line = text.lines().find(|l| l.starts_with("(+)0to1")).unwrap();
        assert!(zero_line.contains("0.333"));
        assert!(zero_line.contains("0.667"));
        let empty_line = text.lines().find(|l| l.starts_with("(-)5to4")).unwrap();
        assert_eq!(empty_line.matches("nan").count(), 3);
    }
}
