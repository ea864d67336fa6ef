// =============================================================================
// Series Indicators Module
// =============================================================================
//
// Pure, side-effect-free series math shared by the VWAP engine and the signal
// binner.  Undefined points are `None` and stay `None`; callers decide how to
// treat them.

pub mod rolling;

pub use rolling::{diff, forward_fill, rolling_std, round_to, shift};
