pub mod resampler;
pub mod sources;

pub use resampler::resample;
pub use sources::{
    InMemoryTickSource, JsonDirTickSource, TickSource, TradingCalendar, WeekdayCalendar,
};
