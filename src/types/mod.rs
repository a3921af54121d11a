//! Core data types and structures

pub mod opportunity;
pub mod factors;
pub mod profit;
pub mod bundle;
pub mod network;
pub mod success;
pub mod events;

pub use opportunity::*;
pub use factors::*;
pub use profit::*;
pub use bundle::*;
pub use network::*;
pub use success::*;
pub use events::*;
