// =============================================================================
// Data sources — tick retrieval and trading-day calendars
// =============================================================================
//
// The pipeline only depends on the two traits below.  The concrete sources
// here are the in-memory one used by tests and callers that already hold
// their ticks, and a JSON directory layout used by the binary:
//
//   <root>/<instrument_id>/<YYYY-MM-DD>.json   (array of ticks)

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use tracing::{debug, trace};

use crate::types::Tick;

/// Supplies the ticks of one instrument inside `[start, end]`, time ordered.
pub trait TickSource: Send + Sync {
    fn query_ticks(
        &self,
        instrument_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Tick>>;
}

/// Supplies the trading dates inside `[start, end]`, ascending.
pub trait TradingCalendar: Send + Sync {
    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>>;
}

// ---------------------------------------------------------------------------
// InMemoryTickSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct InMemoryTickSource {
    ticks: HashMap<String, Vec<Tick>>,
}

impl InMemoryTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add ticks, keeping each instrument's stream in time order.  Ticks with
    /// equal timestamps keep their insertion order.
    pub fn insert(&mut self, ticks: impl IntoIterator<Item = Tick>) {
        for tick in ticks {
            self.ticks
                .entry(tick.instrument_id.clone())
                .or_default()
                .push(tick);
        }
        for stream in self.ticks.values_mut() {
            stream.sort_by_key(|t| t.exchange_time);
        }
    }
}

impl TickSource for InMemoryTickSource {
    fn query_ticks(
        &self,
        instrument_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Tick>> {
        Ok(self
            .ticks
            .get(instrument_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|t| t.exchange_time >= start && t.exchange_time <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// JsonDirTickSource
// ---------------------------------------------------------------------------

/// Reads one JSON array of ticks per instrument and calendar day.
///
/// A missing day file means no ticks for that day, not an error.
#[derive(Debug, Clone)]
pub struct JsonDirTickSource {
    root: PathBuf,
}

impl JsonDirTickSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn day_path(&self, instrument_id: &str, date: NaiveDate) -> PathBuf {
        self.root
            .join(instrument_id)
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    fn read_day(path: &Path) -> Result<Vec<Tick>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ticks from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse ticks from {}", path.display()))
    }
}

impl TickSource for JsonDirTickSource {
    fn query_ticks(
        &self,
        instrument_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Tick>> {
        let mut out = Vec::new();
        let mut date = start.date();

        while date <= end.date() {
            let path = self.day_path(instrument_id, date);
            if path.exists() {
                let day = Self::read_day(&path)?;
                out.extend(
                    day.into_iter()
                        .filter(|t| t.exchange_time >= start && t.exchange_time <= end),
                );
            } else {
                trace!(path = %path.display(), "no tick file for day");
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        out.sort_by_key(|t| t.exchange_time);
        debug!(instrument_id, %start, %end, ticks = out.len(), "ticks loaded");
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// WeekdayCalendar
// ---------------------------------------------------------------------------

/// Monday to Friday, minus an explicit holiday list.
#[derive(Debug, Clone, Default)]
pub struct WeekdayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
        if start > end {
            anyhow::bail!("trading calendar range is reversed: {start} > {end}");
        }

        let mut days = Vec::new();
        let mut date = start;
        while date <= end {
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            if !weekend && !self.holidays.contains(&date) {
                days.push(date);
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        Ok(days)
    }
}
