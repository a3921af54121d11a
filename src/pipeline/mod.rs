//! Wiring of the engine components

pub mod orchestrator;

pub use orchestrator::*;
