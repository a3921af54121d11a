//! Audit persistence
//!
//! Sinks are fire-and-forget from the engine's point of view: callers log
//! failures and never propagate them.

pub mod jsonl;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use crate::types::{ComposedBundle, ProfitResult, SuccessEstimation};

pub use jsonl::*;
pub use memory::*;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_profit(&self, result: &ProfitResult) -> Result<()>;
    async fn record_bundle(&self, bundle: &ComposedBundle) -> Result<()>;
    async fn record_success(&self, estimation: &SuccessEstimation) -> Result<()>;
}
