//! Input/output helpers.
//!
//! - CSV ingest for the high-frequency and daily sources (`ingest`)
//! - CSV persistence of curated tables (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
