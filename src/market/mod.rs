//! Market snapshots, caching and history

pub mod provider;
pub mod cache;
pub mod history;

pub use provider::*;
pub use cache::*;
pub use history::*;
