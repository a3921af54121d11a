//! In-process audit sinks

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use crate::{
    storage::AuditSink,
    types::{ComposedBundle, ProfitResult, SuccessEstimation},
};

/// Keeps every record in memory. Used by tests and the calibration tooling.
#[derive(Default)]
pub struct MemoryAuditSink {
    profits: RwLock<Vec<ProfitResult>>,
    bundles: RwLock<Vec<ComposedBundle>>,
    estimations: RwLock<Vec<SuccessEstimation>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn profits(&self) -> Vec<ProfitResult> {
        self.profits.read().await.clone()
    }

    pub async fn bundles(&self) -> Vec<ComposedBundle> {
        self.bundles.read().await.clone()
    }

    pub async fn estimations(&self) -> Vec<SuccessEstimation> {
        self.estimations.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record_profit(&self, result: &ProfitResult) -> Result<()> {
        self.profits.write().await.push(result.clone());
        Ok(())
    }

    async fn record_bundle(&self, bundle: &ComposedBundle) -> Result<()> {
        self.bundles.write().await.push(bundle.clone());
        Ok(())
    }

    async fn record_success(&self, estimation: &SuccessEstimation) -> Result<()> {
        self.estimations.write().await.push(estimation.clone());
        Ok(())
    }
}

/// Discards everything.
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn record_profit(&self, _result: &ProfitResult) -> Result<()> {
        Ok(())
    }

    async fn record_bundle(&self, _bundle: &ComposedBundle) -> Result<()> {
        Ok(())
    }

    async fn record_success(&self, _estimation: &SuccessEstimation) -> Result<()> {
        Ok(())
    }
}
