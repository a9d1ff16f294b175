//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the volatility column set (`VolColumn`)
//! - row shapes for each pipeline stage (`RawHfRow` .. `CuratedRow`)
//! - run configuration (`PipelineConfig`, `PriceGapPolicy`, `TimestampFormat`)

pub mod types;

pub use types::*;
