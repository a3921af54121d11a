//! Gas & fee modelling

pub mod tables;
pub mod model;

pub use model::*;
