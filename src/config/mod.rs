//! Configuration management for the bundle engine

pub mod settings;

pub use settings::*;
