//! The curation stages, applied in order:
//!
//! align -> merge -> interpolate -> noise

pub mod align;
pub mod interpolate;
pub mod merge;
pub mod noise;

pub use align::{AlignedTables, align, round_to_minute, to_instants};
pub use interpolate::{InterpolatedTable, backward_fill, interpolate, spline_fill};
pub use merge::{MergedTable, merge_ordered};
pub use noise::{inject_noise, max_deviation};
