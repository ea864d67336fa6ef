// =============================================================================
// Multi-Day Aggregator — per-day pipeline runs merged into one series
// =============================================================================
//
// Each (instrument, date) runs resample -> exclusions -> VWAP on its own.  A
// failing day becomes a `DayFailure` next to the merged series instead of
// aborting the batch.  Merging is deterministic: days are ordered by
// (instrument_id, date) whatever order they finished in.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SignalError};
use crate::market_data::{resample, TickSource};
use crate::session::{apply_exclusions, SessionCalendar};
use crate::signals::vwap::{compute_vwap, VwapConfig};
use crate::types::{SignalRow, Tick};

/// Per-day pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub frequency: Duration,
    pub price_decimals: Option<u32>,
    /// Divide VWAP by the product's contract multiplier.
    pub normalize_by_multiplier: bool,
    /// Widening of the session on both sides when querying ticks.
    pub session_padding: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frequency: Duration::seconds(10),
            price_decimals: Some(2),
            normalize_by_multiplier: false,
            session_padding: Duration::minutes(5),
        }
    }
}

/// VWAP rows of one instrument on one trading day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySeries {
    pub instrument_id: String,
    pub date: NaiveDate,
    pub rows: Vec<SignalRow>,
    /// Bars dropped by the break windows.
    pub excluded: usize,
}

/// A day that could not be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct DayFailure {
    pub instrument_id: String,
    pub date: NaiveDate,
    pub error: SignalError,
}

impl std::fmt::Display for DayFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.instrument_id, self.date, self.error)
    }
}

/// Run one day through resample, break exclusion and the VWAP engine.
pub fn process_day(
    instrument_id: &str,
    date: NaiveDate,
    ticks: &[Tick],
    calendar: &SessionCalendar,
    config: &PipelineConfig,
) -> Result<DailySeries> {
    if ticks.is_empty() {
        return Err(SignalError::DataGap {
            instrument_id: instrument_id.to_string(),
            date,
        });
    }

    let windows = calendar.exclusion_windows(instrument_id, date)?;
    let multiplier = if config.normalize_by_multiplier {
        Some(calendar.multiplier(instrument_id)?)
    } else {
        None
    };

    let bars = resample(ticks, config.frequency)?;
    let resampled = bars.len();
    let bars = apply_exclusions(bars, &windows);
    let excluded = resampled - bars.len();

    let vwap_config = VwapConfig {
        decimals: config.price_decimals,
        multiplier,
    };
    let rows = compute_vwap(&bars, date, &vwap_config)?;

    debug!(
        instrument_id,
        %date,
        ticks = ticks.len(),
        rows = rows.len(),
        excluded,
        "day processed"
    );

    Ok(DailySeries {
        instrument_id: instrument_id.to_string(),
        date,
        rows,
        excluded,
    })
}

// =============================================================================
// Merging
// =============================================================================

/// All days' rows in date order, each day's internal order preserved.
pub fn concatenate(mut days: Vec<DailySeries>) -> Vec<SignalRow> {
    days.sort_by(|a, b| (&a.instrument_id, a.date).cmp(&(&b.instrument_id, b.date)));
    days.into_iter().flat_map(|day| day.rows).collect()
}

/// Drop the interval counters and keep only rows with both `vwap` and
/// `delta_vwap` defined.
pub fn prepare_for_rolling(rows: Vec<SignalRow>) -> Vec<SignalRow> {
    rows.into_iter()
        .filter(|r| r.vwap.is_some() && r.delta_vwap.is_some())
        .map(|mut r| {
            r.counters = None;
            r
        })
        .collect()
}

/// Merged result of a batch of per-day runs.
#[derive(Debug, Clone, Default)]
pub struct MultiDayOutcome {
    pub series: Vec<SignalRow>,
    pub failures: Vec<DayFailure>,
    pub days_processed: usize,
}

impl MultiDayOutcome {
    /// Merge per-day results deterministically, whatever their arrival order.
    pub fn collect<I>(results: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<DailySeries, DayFailure>>,
    {
        let mut days = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(day) => days.push(day),
                Err(failure) => failures.push(failure),
            }
        }
        failures.sort_by(|a, b| (&a.instrument_id, a.date).cmp(&(&b.instrument_id, b.date)));

        let days_processed = days.len();
        Self {
            series: concatenate(days),
            failures,
            days_processed,
        }
    }

    /// Failures other than days that simply had no ticks.
    pub fn hard_failures(&self) -> impl Iterator<Item = &DayFailure> {
        self.failures.iter().filter(|f| !f.error.is_data_gap())
    }
}

// =============================================================================
// MultiDayAggregator
// =============================================================================

/// Fetches and processes days for one pipeline configuration.
pub struct MultiDayAggregator {
    calendar: Arc<SessionCalendar>,
    source: Arc<dyn TickSource>,
    config: PipelineConfig,
}

impl MultiDayAggregator {
    pub fn new(
        calendar: Arc<SessionCalendar>,
        source: Arc<dyn TickSource>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            calendar,
            source,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch and process a single day.
    pub fn process(
        &self,
        instrument_id: &str,
        date: NaiveDate,
    ) -> std::result::Result<DailySeries, DayFailure> {
        self.try_process(instrument_id, date).map_err(|error| {
            if error.is_data_gap() {
                info!(instrument_id, %date, "no ticks, day skipped");
            } else {
                warn!(instrument_id, %date, %error, "day failed");
            }
            DayFailure {
                instrument_id: instrument_id.to_string(),
                date,
                error,
            }
        })
    }

    fn try_process(&self, instrument_id: &str, date: NaiveDate) -> Result<DailySeries> {
        let (start, end) =
            self.calendar
                .query_range(instrument_id, date, self.config.session_padding)?;
        let ticks = self
            .source
            .query_ticks(instrument_id, start, end)
            .map_err(|e| SignalError::Retrieval {
                instrument_id: instrument_id.to_string(),
                date,
                reason: format!("{e:#}"),
            })?;
        process_day(instrument_id, date, &ticks, &self.calendar, &self.config)
    }

    /// Process `dates` one after another and merge the results.
    pub fn run(&self, instrument_id: &str, dates: &[NaiveDate]) -> MultiDayOutcome {
        let outcome =
            MultiDayOutcome::collect(dates.iter().map(|date| self.process(instrument_id, *date)));
        info!(
            instrument_id,
            days = dates.len(),
            processed = outcome.days_processed,
            failed = outcome.failures.len(),
            rows = outcome.series.len(),
            "multi-day run complete"
        );
        outcome
    }

    /// Process `dates` on the blocking pool and merge the results.
    ///
    /// A day whose worker panics is logged and left out of the outcome; the
    /// other days are unaffected.
    pub async fn run_concurrent(
        self: &Arc<Self>,
        instrument_id: &str,
        dates: &[NaiveDate],
    ) -> MultiDayOutcome {
        let mut tasks = JoinSet::new();
        for &date in dates {
            let aggregator = Arc::clone(self);
            let instrument_id = instrument_id.to_string();
            tasks.spawn_blocking(move || aggregator.process(&instrument_id, date));
        }

        let mut results = Vec::with_capacity(dates.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!(instrument_id, error = %e, "day worker panicked"),
            }
        }

        let finished: BTreeSet<NaiveDate> = results
            .iter()
            .map(|r| match r {
                Ok(day) => day.date,
                Err(failure) => failure.date,
            })
            .collect();
        for date in dates.iter().filter(|d| !finished.contains(d)) {
            error!(instrument_id, %date, "day lost to a worker panic, skipped");
        }

        let outcome = MultiDayOutcome::collect(results);
        info!(
            instrument_id,
            days = dates.len(),
            processed = outcome.days_processed,
            failed = outcome.failures.len(),
            lost = dates.len().saturating_sub(finished.len()),
            rows = outcome.series.len(),
            "concurrent multi-day run complete"
        );
        outcome
    }
}
