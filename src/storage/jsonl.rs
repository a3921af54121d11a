//! Daily JSONL audit files

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use crate::{
    storage::AuditSink,
    types::{ComposedBundle, ProfitResult, SuccessEstimation},
};

/// Appends one JSON line per record under `<root>/{profits,bundles,estimations}/`.
pub struct JsonlAuditStore {
    root: PathBuf,
}

impl JsonlAuditStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn daily_file(&self, dir: &str, prefix: &str) -> PathBuf {
        self.root
            .join(dir)
            .join(format!("{}_{}.jsonl", prefix, Utc::now().format("%Y-%m-%d")))
    }
}

fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    writeln!(file, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

#[async_trait]
impl AuditSink for JsonlAuditStore {
    async fn record_profit(&self, result: &ProfitResult) -> Result<()> {
        append_line(&self.daily_file("profits", "profit_results"), result)?;

        info!(
            opportunity_id = %result.opportunity_id,
            risk_adjusted = %result.net_profit.risk_adjusted,
            profitability = result.probabilities.profitability,
            "Saved profit result"
        );
        Ok(())
    }

    async fn record_bundle(&self, bundle: &ComposedBundle) -> Result<()> {
        append_line(&self.daily_file("bundles", "composed_bundles"), bundle)?;

        info!(
            bundle_id = %bundle.id,
            strategy = %bundle.composition.strategy,
            size = bundle.size(),
            net_profit = %bundle.metrics.net_profit,
            is_valid = bundle.validation.is_valid,
            "Saved composed bundle"
        );
        Ok(())
    }

    async fn record_success(&self, estimation: &SuccessEstimation) -> Result<()> {
        append_line(&self.daily_file("estimations", "success_estimations"), estimation)?;

        info!(
            bundle_id = %estimation.bundle_id,
            probability = estimation.success_probability,
            confidence = estimation.confidence,
            "Saved success estimation"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_record() {
        let root = std::env::temp_dir().join(format!("bundle-engine-{}", uuid::Uuid::new_v4()));
        let path = root.join("profits").join("x.jsonl");

        append_line(&path, &serde_json::json!({ "a": 1 })).unwrap();
        append_line(&path, &serde_json::json!({ "a": 2 })).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn daily_file_is_scoped_by_directory() {
        let store = JsonlAuditStore::new("output");
        let path = store.daily_file("bundles", "composed_bundles");
        assert!(path.starts_with("output/bundles"));
        assert!(path.to_string_lossy().ends_with(".jsonl"));
    }
}
