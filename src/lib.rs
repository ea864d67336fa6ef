// =============================================================================
// vwap-signal — VWAP delta signals from futures ticks
// =============================================================================
//
// ticks -> resampler -> session breaks -> VWAP engine -> multi-day merge
//       -> binner -> probability estimator

pub mod analysis;
pub mod error;
pub mod indicators;
pub mod market_data;
pub mod multi_day;
pub mod runtime_config;
pub mod session;
pub mod signals;
pub mod types;

pub use error::{Result, SignalError};
