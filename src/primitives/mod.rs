//! Core compute primitives.
//!
//! The dense row-major [`Matrix`] is the foundation for every estimator and
//! transformer in the crate.

mod matrix;

pub(crate) use matrix::dot;
pub use matrix::Matrix;
