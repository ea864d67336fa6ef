// =============================================================================
// Pipeline errors
// =============================================================================
//
// Arithmetic edge cases (zero-volume interval, zero rolling std, empty bin) are
// NOT errors. They travel through the pipeline as `None` values. Only bad
// input, unresolvable configuration and missing or unreadable days surface
// here.

use chrono::NaiveDate;
use thiserror::Error;

/// All errors produced by the signal pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no ticks for {instrument_id} on {date}")]
    DataGap {
        instrument_id: String,
        date: NaiveDate,
    },

    #[error("tick retrieval failed for {instrument_id} on {date}: {reason}")]
    Retrieval {
        instrument_id: String,
        date: NaiveDate,
        reason: String,
    },
}

impl SignalError {
    /// A day that simply had nothing to process, as opposed to a broken one.
    pub fn is_data_gap(&self) -> bool {
        matches!(self, SignalError::DataGap { .. })
    }
}

pub type Result<T> = std::result::Result<T, SignalError>;
