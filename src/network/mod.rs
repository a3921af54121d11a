//! Network-condition providers, refresh loop and retry helpers

pub mod provider;
pub mod monitor;
pub mod retry;

pub use provider::*;
pub use monitor::*;
pub use retry::*;
