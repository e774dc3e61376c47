//! Graphics and variable state: per-frame [`context::Context`], the
//! [`stack::ContextStack`] with its scoping rules, the attribute
//! dirty-flag protocol, colour and world-unit lookup, and legend
//! accumulation.

pub mod attributes;
pub mod color;
pub mod context;
pub mod legend;
pub mod stack;
pub mod units;

pub use attributes::AttributeMask;
pub use context::{Context, DatasetHandle, FileDrawKind, MM_PER_INCH, PageRef, PageState};
pub use legend::{LegendEntry, LegendKind, LegendList};
pub use stack::ContextStack;
pub use units::WorldUnits;
