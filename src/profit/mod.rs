//! Profit calculation engine and its input checks

pub mod validation;
pub mod calculator;

pub use validation::*;
pub use calculator::*;
