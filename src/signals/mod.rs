// =============================================================================
// Signals Module
// =============================================================================
//
// Per-row signal pipeline, in order of application:
// - VWAP engine (interval VWAP, delta, delta-of-delta)
// - Binner (rolling-std normalization, unit bins, lagged join with direction)
// - Probability estimator (direction frequencies per bin)

pub mod binner;
pub mod probability;
pub mod vwap;

pub use binner::{bin_signal, bin_signal_per_day, DeltaBin};
pub use probability::{estimate, ProbabilityRow, ProbabilityTable};
pub use vwap::{compute_vwap, VwapConfig};
