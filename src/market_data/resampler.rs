// =============================================================================
// Resampler — irregular ticks to a fixed-frequency grid
// =============================================================================
//
// Slots are aligned to midnight of the first tick's date.  Slot `s` covers
// `[s, s + frequency)` and carries the last tick that arrived before its end;
// a slot with no tick of its own repeats the previous slot.  The first slot is
// always the literal first tick, never an aggregate of the slot.
//
// `volume_shift` / `turnover_shift` hold the previous slot's cumulative
// counters, i.e. the opening reference of the interval the slot closes.

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::error::{Result, SignalError};
use crate::session::calendar::midnight;
use crate::types::{ResampledBar, Tick};

/// Resample an ordered tick stream at `frequency`.
///
/// Empty input yields an empty series and a single tick yields one bar.
/// Fails on a frequency that is not a positive whole number of milliseconds,
/// on ticks out of time order, and on ticks from more than one instrument.
pub fn resample(ticks: &[Tick], frequency: Duration) -> Result<Vec<ResampledBar>> {
    let step_ms = frequency.num_milliseconds();
    if step_ms <= 0 {
        return Err(SignalError::InvalidInput(format!(
            "resample frequency must be positive, got {frequency}"
        )));
    }
    if frequency != Duration::milliseconds(step_ms) {
        return Err(SignalError::InvalidInput(format!(
            "resample frequency must be a whole number of milliseconds, got {frequency}"
        )));
    }

    let (first, last) = match (ticks.first(), ticks.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(Vec::new()),
    };

    validate_stream(ticks)?;

    let step = Duration::milliseconds(step_ms);
    let origin = midnight(first.exchange_time.date());
    let floor = |t: NaiveDateTime| {
        let elapsed = (t - origin).num_milliseconds();
        origin + Duration::milliseconds(elapsed / step_ms * step_ms)
    };
    let first_slot = floor(first.exchange_time);
    let last_slot = floor(last.exchange_time);

    let slots = ((last_slot - first_slot).num_milliseconds() / step_ms + 1) as usize;
    let mut bars: Vec<ResampledBar> = Vec::with_capacity(slots);

    let mut next = 0usize;
    let mut current = first;
    let mut slot = first_slot;

    while slot <= last_slot {
        let slot_end = slot + step;
        while next < ticks.len() && ticks[next].exchange_time < slot_end {
            current = &ticks[next];
            next += 1;
        }

        let source = if bars.is_empty() { first } else { current };
        let (volume_shift, turnover_shift) = match bars.last() {
            Some(prev) => (Some(prev.volume), Some(prev.turnover)),
            None => (None, None),
        };

        bars.push(ResampledBar {
            timestamp: slot,
            instrument_id: source.instrument_id.clone(),
            source_time: source.exchange_time,
            last_price: source.last_price,
            volume: source.volume,
            turnover: source.turnover,
            volume_shift,
            turnover_shift,
        });

        slot = slot_end;
    }

    debug!(
        instrument_id = %first.instrument_id,
        ticks = ticks.len(),
        bars = bars.len(),
        carried = bars.iter().filter(|b| b.is_carried()).count(),
        frequency_ms = step_ms,
        "ticks resampled"
    );

    Ok(bars)
}

fn validate_stream(ticks: &[Tick]) -> Result<()> {
    for pair in ticks.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        if cur.instrument_id != prev.instrument_id {
            return Err(SignalError::InvalidInput(format!(
                "tick stream mixes instruments '{}' and '{}'",
                prev.instrument_id, cur.instrument_id
            )));
        }
        if cur.exchange_time < prev.exchange_time {
            return Err(SignalError::InvalidInput(format!(
                "tick at {} arrives after tick at {}",
                cur.exchange_time, prev.exchange_time
            )));
        }
    }
    Ok(())
}
