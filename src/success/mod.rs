//! Bundle inclusion probability

pub mod estimator;
pub mod seasonal;

pub use estimator::*;
