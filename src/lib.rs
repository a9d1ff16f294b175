//! `vol-mesh` library crate.
//!
//! Fuses a high-frequency index price series with a daily implied-volatility
//! surface into one gap-free series at the high-frequency cadence.
//!
//! The binary (`curate`) is a thin wrapper around this library so that:
//!
//! - every pipeline stage is testable without spawning processes
//! - the pre-noise and curated tables are plain data any front-end can consume

pub mod app;
pub mod cli;
pub mod curate;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
