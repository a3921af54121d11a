//! Bundle composition: filtering, strategy selection, collaborator review and
//! final metrics.

pub mod collaborators;
pub mod validation;
pub mod scoring;
pub mod strategies;
pub mod composer;

pub use collaborators::*;
pub use validation::*;
pub use composer::*;
