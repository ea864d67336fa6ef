pub mod calendar;
pub mod products;

pub use calendar::{
    apply_exclusions, product_class, BreakKind, ExclusionWindow, SessionCalendar, SessionWindow,
};
pub use products::{Exchange, ProductCatalog, ProductMetadata, ProductSpec};
