// =============================================================================
// Session Calendar — trading hours and market breaks per product class
// =============================================================================
//
// Day session breaks on the Chinese futures exchanges:
//
//   morning break   (10:15:00, 10:30:00]   skipped by index / treasury futures
//   lunch break     (11:30:00, 13:30:00]
//
// Both windows are open at the start and closed at the end: the bar stamped
// exactly at the break start is still a trading bar, the one stamped at the
// break end is not.
//
// The product class is recovered from the instrument id by stripping the
// contract-month suffix: four characters when the fourth-from-last character
// is a digit (`ni2001` -> `ni`), three otherwise (`SR001` -> `SR`).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Result, SignalError};
use crate::session::products::{Exchange, ProductMetadata};
use crate::types::ResampledBar;

/// Product classes that trade straight through the morning break.
pub const NO_MORNING_BREAK: &[&str] = &["IC", "IF", "IH", "T", "TF", "TS"];

/// CFFEX treasury-bond futures (longer session than index futures).
const TREASURY_FUTURES: &[&str] = &["T", "TF", "TS"];

const fn hms(h: u32, m: u32, s: u32) -> u32 {
    h * 3600 + m * 60 + s
}

pub const MORNING_BREAK: ClockRange = ClockRange::new(hms(10, 15, 0), hms(10, 30, 0));
pub const LUNCH_BREAK: ClockRange = ClockRange::new(hms(11, 30, 0), hms(13, 30, 0));

/// Midnight at the start of `date`.
pub(crate) fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

// =============================================================================
// Types
// =============================================================================

/// Clock range in seconds from midnight, open at `start`, closed at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockRange {
    pub start_secs: u32,
    pub end_secs: u32,
}

impl ClockRange {
    pub const fn new(start_secs: u32, end_secs: u32) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    fn on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let base = midnight(date);
        (
            base + Duration::seconds(i64::from(self.start_secs)),
            base + Duration::seconds(i64::from(self.end_secs)),
        )
    }
}

impl std::fmt::Display for ClockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = |s: u32| format!("{:02}:{:02}:{:02}", s / 3600, (s / 60) % 60, s % 60);
        write!(f, "({}, {}]", clock(self.start_secs), clock(self.end_secs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakKind {
    Morning,
    Lunch,
}

impl std::fmt::Display for BreakKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Morning => write!(f, "morning"),
            Self::Lunch => write!(f, "lunch"),
        }
    }
}

/// A dated break: rows with `start < timestamp <= end` are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionWindow {
    pub kind: BreakKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ExclusionWindow {
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts > self.start && ts <= self.end
    }
}

/// Trading-session layout of one product class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub product_class: String,
    pub exchange: Exchange,
    pub multiplier: f64,
    pub open_secs: u32,
    pub close_secs: u32,
    pub has_morning_break: bool,
    pub morning_break: ClockRange,
    pub lunch_break: ClockRange,
}

impl SessionWindow {
    /// Excluded ranges on `date`, in clock order.
    pub fn exclusions_on(&self, date: NaiveDate) -> Vec<ExclusionWindow> {
        let mut windows = Vec::with_capacity(2);
        if self.has_morning_break {
            let (start, end) = self.morning_break.on(date);
            windows.push(ExclusionWindow {
                kind: BreakKind::Morning,
                start,
                end,
            });
        }
        let (start, end) = self.lunch_break.on(date);
        windows.push(ExclusionWindow {
            kind: BreakKind::Lunch,
            start,
            end,
        });
        windows
    }

    pub fn open_on(&self, date: NaiveDate) -> NaiveDateTime {
        midnight(date) + Duration::seconds(i64::from(self.open_secs))
    }

    pub fn close_on(&self, date: NaiveDate) -> NaiveDateTime {
        midnight(date) + Duration::seconds(i64::from(self.close_secs))
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Strip the contract-month suffix from an instrument id.
///
/// Fails when the id is too short, the stripped suffix is not all digits, or
/// what remains is not a purely alphabetic product code.
pub fn product_class(instrument_id: &str) -> Result<String> {
    let chars: Vec<char> = instrument_id.chars().collect();
    if chars.len() < 4 {
        return Err(SignalError::Configuration(format!(
            "instrument id '{instrument_id}' is too short to carry a contract month"
        )));
    }

    let suffix_len = if chars[chars.len() - 4].is_ascii_digit() { 4 } else { 3 };
    let (prefix, suffix) = chars.split_at(chars.len() - suffix_len);

    if prefix.is_empty()
        || !prefix.iter().all(char::is_ascii_alphabetic)
        || !suffix.iter().all(char::is_ascii_digit)
    {
        return Err(SignalError::Configuration(format!(
            "cannot resolve product class of instrument '{instrument_id}'"
        )));
    }

    Ok(prefix.iter().collect())
}

fn session_hours(product_class: &str, exchange: Exchange) -> (u32, u32) {
    match exchange {
        Exchange::Cffex if TREASURY_FUTURES.contains(&product_class) => {
            (hms(9, 15, 0), hms(15, 15, 0))
        }
        Exchange::Cffex => (hms(9, 30, 0), hms(15, 0, 0)),
        _ => (hms(9, 0, 0), hms(15, 0, 0)),
    }
}

// =============================================================================
// SessionCalendar
// =============================================================================

/// Resolves session layouts per instrument, caching each resolution.
pub struct SessionCalendar {
    products: Arc<dyn ProductMetadata>,
    cache: RwLock<HashMap<String, SessionWindow>>,
}

impl SessionCalendar {
    pub fn new(products: Arc<dyn ProductMetadata>) -> Self {
        Self {
            products,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Session layout for `instrument_id`.
    ///
    /// Fails with a configuration error when the product class cannot be
    /// derived or is not in the product table.
    pub fn session_window(&self, instrument_id: &str) -> Result<SessionWindow> {
        if let Some(window) = self.cache.read().get(instrument_id) {
            return Ok(window.clone());
        }

        let class = product_class(instrument_id)?;
        let spec = self.products.lookup(&class).ok_or_else(|| {
            SignalError::Configuration(format!(
                "unknown product class '{class}' (instrument '{instrument_id}')"
            ))
        })?;

        let (open_secs, close_secs) = session_hours(&class, spec.exchange);
        let window = SessionWindow {
            has_morning_break: !NO_MORNING_BREAK.contains(&class.as_str()),
            product_class: class,
            exchange: spec.exchange,
            multiplier: spec.multiplier,
            open_secs,
            close_secs,
            morning_break: MORNING_BREAK,
            lunch_break: LUNCH_BREAK,
        };

        debug!(
            instrument_id,
            product_class = %window.product_class,
            exchange = %window.exchange,
            has_morning_break = window.has_morning_break,
            "session window resolved"
        );

        self.cache
            .write()
            .insert(instrument_id.to_string(), window.clone());
        Ok(window)
    }

    /// Ordered break windows for `instrument_id` on `date`.
    pub fn exclusion_windows(
        &self,
        instrument_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<ExclusionWindow>> {
        Ok(self.session_window(instrument_id)?.exclusions_on(date))
    }

    /// Tick query range: the session widened by `padding` on both sides.
    pub fn query_range(
        &self,
        instrument_id: &str,
        date: NaiveDate,
        padding: Duration,
    ) -> Result<(NaiveDateTime, NaiveDateTime)> {
        if padding < Duration::zero() {
            return Err(SignalError::InvalidInput(format!(
                "session padding must not be negative, got {padding}"
            )));
        }
        let window = self.session_window(instrument_id)?;
        Ok((window.open_on(date) - padding, window.close_on(date) + padding))
    }

    /// Contract multiplier of the instrument's product class.
    pub fn multiplier(&self, instrument_id: &str) -> Result<f64> {
        let window = self.session_window(instrument_id)?;
        if window.multiplier.is_finite() && window.multiplier > 0.0 {
            Ok(window.multiplier)
        } else {
            Err(SignalError::Configuration(format!(
                "product '{}' has no usable multiplier ({})",
                window.product_class, window.multiplier
            )))
        }
    }
}

/// Drop every bar that falls inside any of `windows`.
///
/// Dropped bars leave no gap behind: the next surviving bar directly follows
/// the last one before the break.
pub fn apply_exclusions(bars: Vec<ResampledBar>, windows: &[ExclusionWindow]) -> Vec<ResampledBar> {
    let before = bars.len();
    let kept: Vec<ResampledBar> = bars
        .into_iter()
        .filter(|bar| !windows.iter().any(|w| w.contains(bar.timestamp)))
        .collect();
    trace!(before, after = kept.len(), "exclusion windows applied");
    kept
}
