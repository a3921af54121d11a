//! External collaborators consulted after selection

use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Reverse;
use crate::{
    config::BundleConstraints,
    types::{BundleCandidate, Opportunity, OpportunityKind, RiskAssessment},
    utils::to_f64,
};

/// Reorders the selected transactions. Must return a permutation of its input.
#[async_trait]
pub trait OrderOptimizer: Send + Sync {
    async fn optimize(
        &self,
        transactions: &[Opportunity],
        constraints: &BundleConstraints,
    ) -> Result<Vec<Opportunity>>;
}

#[async_trait]
pub trait RiskAssessor: Send + Sync {
    async fn assess_bundle_risk(&self, bundle: &BundleCandidate) -> Result<RiskAssessment>;
}

/// Time-sensitive kinds first, then declared profit descending. Stable.
pub struct ProfitPriorityOptimizer;

fn execution_priority(kind: OpportunityKind) -> u8 {
    match kind {
        OpportunityKind::Liquidation => 0,
        OpportunityKind::Sandwich => 1,
        OpportunityKind::Arbitrage => 2,
        OpportunityKind::Flashloan => 3,
    }
}

#[async_trait]
impl OrderOptimizer for ProfitPriorityOptimizer {
    async fn optimize(
        &self,
        transactions: &[Opportunity],
        _constraints: &BundleConstraints,
    ) -> Result<Vec<Opportunity>> {
        let mut ordered = transactions.to_vec();
        ordered.sort_by_key(|o| (execution_priority(o.kind), Reverse(o.declared_profit)));
        Ok(ordered)
    }
}

/// Profit-weighted mean of declared risk; confidence shrinks with size.
pub struct WeightedRiskAssessor {
    pub size_confidence_decay: f64,
}

impl Default for WeightedRiskAssessor {
    fn default() -> Self {
        Self { size_confidence_decay: 0.02 }
    }
}

#[async_trait]
impl RiskAssessor for WeightedRiskAssessor {
    async fn assess_bundle_risk(&self, bundle: &BundleCandidate) -> Result<RiskAssessment> {
        Ok(weighted_assessment(bundle, self.size_confidence_decay))
    }
}

pub fn weighted_assessment(bundle: &BundleCandidate, size_confidence_decay: f64) -> RiskAssessment {
    let total_weight: f64 = bundle
        .transactions
        .iter()
        .map(|o| to_f64(o.declared_profit).max(0.0))
        .sum();

    let overall_risk = if total_weight > 0.0 {
        bundle
            .transactions
            .iter()
            .map(|o| o.declared_risk_score * to_f64(o.declared_profit).max(0.0))
            .sum::<f64>()
            / total_weight
    } else {
        bundle.average_risk()
    }
    .clamp(0.0, 10.0);

    let extra = bundle.len().saturating_sub(1) as f64;
    let confidence_level =
        ((1.0 - overall_risk / 10.0) * (1.0 - size_confidence_decay * extra)).clamp(0.0, 1.0);

    RiskAssessment {
        overall_risk,
        confidence_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::opportunity;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn optimizer_puts_liquidations_first() {
        let mut liq = opportunity("liq", dec!(0.02));
        liq.kind = OpportunityKind::Liquidation;
        let txs = vec![opportunity("a", dec!(0.5)), liq, opportunity("b", dec!(0.9))];

        let ordered = ProfitPriorityOptimizer
            .optimize(&txs, &BundleConstraints::default())
            .await
            .unwrap();
        let ids: Vec<_> = ordered.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["liq", "b", "a"]);
    }

    #[tokio::test]
    async fn assessment_weights_by_profit() {
        let mut risky = opportunity("r", dec!(0.9));
        risky.declared_risk_score = 8.0;
        let mut safe = opportunity("s", dec!(0.1));
        safe.declared_risk_score = 2.0;

        let mut bundle = BundleCandidate::default();
        bundle.push(risky);
        bundle.push(safe);

        let assessment = WeightedRiskAssessor::default().assess_bundle_risk(&bundle).await.unwrap();
        assert!((assessment.overall_risk - 7.4).abs() < 1e-9);
        assert!(assessment.confidence_level < 0.26 + 1e-9);
    }
}
