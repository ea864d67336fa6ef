// =============================================================================
// Analysis — merged VWAP series to a conditional probability table
// =============================================================================

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::multi_day::{prepare_for_rolling, DayFailure, MultiDayOutcome};
use crate::signals::binner::{bin_signal, bin_signal_per_day};
use crate::signals::probability::{estimate, ProbabilityTable};
use crate::types::SignalRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub lookback: usize,
    pub shift_lag: usize,
    /// Restart rolling windows, price changes and the bin shift every day.
    pub reset_at_day_boundary: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            lookback: 100,
            shift_lag: 1,
            reset_at_day_boundary: false,
        }
    }
}

/// Everything one (instrument, frequency) run produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub table: ProbabilityTable,
    /// Binned rows the table was estimated from.
    pub series: Vec<SignalRow>,
    pub failures: Vec<DayFailure>,
    pub days_processed: usize,
}

/// Bin the merged series of `instrument_id` and estimate its probability table.
pub fn analyse(
    run_id: Uuid,
    instrument_id: &str,
    outcome: MultiDayOutcome,
    frequency: Duration,
    params: &AnalysisParams,
) -> Result<AnalysisReport> {
    let MultiDayOutcome {
        series,
        failures,
        days_processed,
    } = outcome;

    let rows: Vec<SignalRow> = prepare_for_rolling(series)
        .into_iter()
        .filter(|r| r.instrument_id == instrument_id)
        .collect();

    let binned = if params.reset_at_day_boundary {
        bin_signal_per_day(rows, params.lookback, params.shift_lag)?
    } else {
        bin_signal(rows, params.lookback, params.shift_lag)?
    };

    let table = ProbabilityTable::new(run_id, instrument_id, frequency, estimate(&binned));

    info!(
        %run_id,
        instrument_id,
        frequency_secs = frequency.num_seconds(),
        rows = binned.len(),
        observations = table.observations(),
        "probability table estimated"
    );

    Ok(AnalysisReport {
        table,
        series: binned,
        failures,
        days_processed,
    })
}
