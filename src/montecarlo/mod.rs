//! Monte Carlo confidence estimation

pub mod engine;

pub use engine::*;
