//! Mathematical utilities: natural cubic spline interpolation.

pub mod spline;

pub use spline::*;
