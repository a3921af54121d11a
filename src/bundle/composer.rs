//! Bundle composer

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::{
    bundle::{
        collaborators::{weighted_assessment, OrderOptimizer, ProfitPriorityOptimizer, RiskAssessor, WeightedRiskAssessor},
        strategies::select,
        validation::final_issues,
    },
    config::BundleConstraints,
    gas::{GasFeeModel, GasOptions},
    types::{
        BundleCandidate, BundleMetrics, BundleValidation, ComposedBundle, CompositionInfo,
        CompositionStrategy, EngineEvent, EventSink, Opportunity, RiskAssessment,
    },
    utils::to_f64,
};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CompositionStats {
    pub attempts: u64,
    pub composed: u64,
    pub empty: u64,
    pub invalid: u64,
    pub total_time_ms: u64,
}

impl CompositionStats {
    pub fn mean_time_ms(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.total_time_ms as f64 / self.attempts as f64
        }
    }
}

pub struct BundleComposer {
    gas_model: Arc<GasFeeModel>,
    optimizer: Arc<dyn OrderOptimizer>,
    assessor: Arc<dyn RiskAssessor>,
    events: EventSink,
    stats: RwLock<HashMap<CompositionStrategy, CompositionStats>>,
}

impl BundleComposer {
    pub fn new(gas_model: Arc<GasFeeModel>, events: EventSink) -> Self {
        Self {
            gas_model,
            optimizer: Arc::new(ProfitPriorityOptimizer),
            assessor: Arc::new(WeightedRiskAssessor::default()),
            events,
            stats: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_optimizer(mut self, optimizer: Arc<dyn OrderOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_assessor(mut self, assessor: Arc<dyn RiskAssessor>) -> Self {
        self.assessor = assessor;
        self
    }

    pub async fn stats(&self) -> HashMap<CompositionStrategy, CompositionStats> {
        self.stats.read().await.clone()
    }

    /// `None` when nothing survives filtering and selection. A bundle that was
    /// built but fails final validation comes back with `is_valid = false`.
    pub async fn compose(
        &self,
        opportunities: &[Opportunity],
        constraints: &BundleConstraints,
        strategy: CompositionStrategy,
    ) -> Option<ComposedBundle> {
        self.compose_at(opportunities, constraints, strategy, Utc::now()).await
    }

    pub async fn compose_at(
        &self,
        opportunities: &[Opportunity],
        constraints: &BundleConstraints,
        strategy: CompositionStrategy,
        now: DateTime<Utc>,
    ) -> Option<ComposedBundle> {
        let started = Instant::now();
        let eligible = filter_eligible(opportunities, constraints, now);
        debug!(
            "Composing with {}: {}/{} opportunities eligible",
            strategy,
            eligible.len(),
            opportunities.len()
        );

        let selected = select(strategy, &eligible, constraints);
        if selected.is_empty() {
            self.record(strategy, started, None).await;
            self.events.emit(EngineEvent::CompositionRejected {
                strategy,
                opportunities_considered: opportunities.len(),
            });
            return None;
        }

        let candidate = self.reorder(selected, constraints).await;
        let assessment = self.assess(&candidate).await;
        let bundle_gas = self.gas_model.estimate_bundle(&candidate.transactions, &GasOptions::default());

        let gross_profit = candidate.estimated_profit;
        let total_gas_cost = bundle_gas.total_bundle_cost;
        let gas_efficiency = if total_gas_cost > Decimal::ZERO {
            gross_profit.checked_div(total_gas_cost).map(to_f64).unwrap_or(f64::MAX)
        } else {
            0.0
        };

        let metrics = BundleMetrics {
            gross_profit,
            net_profit: gross_profit.saturating_sub(total_gas_cost),
            total_gas_cost,
            gas_efficiency,
            overall_risk: assessment.overall_risk,
            confidence_level: assessment.confidence_level,
        };

        let issues = final_issues(candidate.len(), &metrics, constraints);
        let bundle = ComposedBundle {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            transactions: candidate.transactions,
            metrics,
            validation: BundleValidation {
                is_valid: issues.is_empty(),
                issues,
            },
            composition: CompositionInfo {
                strategy,
                composition_time_ms: started.elapsed().as_millis() as u64,
                opportunities_considered: opportunities.len(),
            },
            tip: bundle_gas.total_priority_fee,
        };

        self.record(strategy, started, Some(bundle.validation.is_valid)).await;

        info!(
            "Composed {} bundle {}: {} txs, net {} SOL, risk {:.2}, valid={}",
            strategy,
            bundle.id,
            bundle.size(),
            bundle.metrics.net_profit.round_dp(6),
            bundle.metrics.overall_risk,
            bundle.validation.is_valid
        );
        for issue in &bundle.validation.issues {
            debug!("Bundle {} issue: {}", bundle.id, issue);
        }

        self.events.emit(EngineEvent::BundleComposed {
            bundle_id: bundle.id.clone(),
            strategy,
            size: bundle.size(),
            net_profit: bundle.metrics.net_profit,
            is_valid: bundle.validation.is_valid,
        });

        Some(bundle)
    }

    async fn reorder(&self, selected: BundleCandidate, constraints: &BundleConstraints) -> BundleCandidate {
        match self.optimizer.optimize(&selected.transactions, constraints).await {
            Ok(order) if is_permutation(&selected.transactions, &order) => {
                let mut reordered = BundleCandidate::default();
                for opportunity in order {
                    reordered.push(opportunity);
                }
                reordered
            }
            Ok(_) => {
                warn!("Order optimizer returned a different transaction set, keeping selection order");
                selected
            }
            Err(e) => {
                warn!("Order optimizer failed, keeping selection order: {:#}", e);
                selected
            }
        }
    }

    async fn assess(&self, candidate: &BundleCandidate) -> RiskAssessment {
        match self.assessor.assess_bundle_risk(candidate).await {
            Ok(a) if a.overall_risk.is_finite() && a.confidence_level.is_finite() => RiskAssessment {
                overall_risk: a.overall_risk.clamp(0.0, 10.0),
                confidence_level: a.confidence_level.clamp(0.0, 1.0),
            },
            Ok(_) => {
                warn!("Risk assessor returned non-finite values, using local assessment");
                weighted_assessment(candidate, WeightedRiskAssessor::default().size_confidence_decay)
            }
            Err(e) => {
                warn!("Risk assessor failed, using local assessment: {:#}", e);
                weighted_assessment(candidate, WeightedRiskAssessor::default().size_confidence_decay)
            }
        }
    }

    async fn record(&self, strategy: CompositionStrategy, started: Instant, valid: Option<bool>) {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(strategy).or_default();
        entry.attempts += 1;
        entry.total_time_ms += started.elapsed().as_millis() as u64;
        match valid {
            None => entry.empty += 1,
            Some(true) => entry.composed += 1,
            Some(false) => {
                entry.composed += 1;
                entry.invalid += 1;
            }
        }
    }
}

/// Drops opportunities that can never be part of a viable bundle.
pub fn filter_eligible(
    opportunities: &[Opportunity],
    constraints: &BundleConstraints,
    now: DateTime<Utc>,
) -> Vec<Opportunity> {
    opportunities
        .iter()
        .filter(|o| o.declared_profit > Decimal::ZERO)
        .filter(|o| o.declared_gas_cost < o.declared_profit)
        .filter(|o| !o.is_stale(now, constraints.opportunity_ttl_secs))
        .filter(|o| o.declared_profit >= constraints.min_profit_threshold)
        .filter(|o| o.declared_risk_score <= constraints.max_risk_score)
        .filter(|o| o.venues().all(|v| constraints.venue_allowed(v)))
        .cloned()
        .collect()
}

fn is_permutation(original: &[Opportunity], reordered: &[Opportunity]) -> bool {
    if original.len() != reordered.len() {
        return false;
    }
    let mut a: Vec<&str> = original.iter().map(|o| o.id.as_str()).collect();
    let mut b: Vec<&str> = reordered.iter().map(|o| o.id.as_str()).collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GasConfig;
    use crate::test_support::opportunity;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    fn composer() -> BundleComposer {
        BundleComposer::new(Arc::new(GasFeeModel::new(GasConfig::default())), EventSink::default())
    }

    struct DroppingOptimizer;

    #[async_trait]
    impl OrderOptimizer for DroppingOptimizer {
        async fn optimize(&self, txs: &[Opportunity], _: &BundleConstraints) -> anyhow::Result<Vec<Opportunity>> {
            Ok(txs[..txs.len().saturating_sub(1)].to_vec())
        }
    }

    struct BrokenAssessor;

    #[async_trait]
    impl RiskAssessor for BrokenAssessor {
        async fn assess_bundle_risk(&self, _: &BundleCandidate) -> anyhow::Result<RiskAssessment> {
            Err(anyhow!("assessor offline"))
        }
    }

    #[test]
    fn gas_equal_to_profit_is_excluded() {
        let mut edge = opportunity("edge", dec!(0.05));
        edge.declared_gas_cost = dec!(0.05);
        let now = edge.detected_at;
        assert!(filter_eligible(&[edge], &BundleConstraints::default(), now).is_empty());
    }

    #[test]
    fn filters_stale_and_disallowed_venues() {
        let fresh = opportunity("fresh", dec!(0.1));
        let now = fresh.detected_at;
        let mut stale = opportunity("stale", dec!(0.1));
        stale.detected_at = now - chrono::Duration::seconds(120);
        let mut elsewhere = opportunity("elsewhere", dec!(0.1));
        elsewhere.primary_venue = "phoenix".to_string();

        let constraints = BundleConstraints {
            allowed_venues: Some(vec!["Raydium".to_string(), "orca".to_string()]),
            ..Default::default()
        };
        let eligible = filter_eligible(&[fresh, stale, elsewhere], &constraints, now);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, "fresh");
    }

    #[tokio::test]
    async fn returns_none_and_counts_empty_composition() {
        let composer = composer();
        let bundle = composer
            .compose(&[], &BundleConstraints::default(), CompositionStrategy::Greedy)
            .await;
        assert!(bundle.is_none());
        assert_eq!(composer.stats().await[&CompositionStrategy::Greedy].empty, 1);
    }

    #[tokio::test]
    async fn composes_valid_bundle_with_metrics() {
        let composer = composer();
        let opps = vec![opportunity("a", dec!(0.3)), opportunity("b", dec!(0.2))];
        let bundle = composer
            .compose(&opps, &BundleConstraints::default(), CompositionStrategy::Greedy)
            .await
            .unwrap();

        assert!(bundle.validation.is_valid, "{:?}", bundle.validation.issues);
        assert_eq!(bundle.size(), 2);
        assert_eq!(bundle.metrics.gross_profit, dec!(0.5));
        assert!(bundle.metrics.total_gas_cost > Decimal::ZERO);
        assert!(bundle.tip > Decimal::ZERO);
        assert!(bundle.metrics.gas_efficiency > 1.0);
    }

    #[tokio::test]
    async fn collaborator_faults_fall_back_locally() {
        let composer = composer()
            .with_optimizer(Arc::new(DroppingOptimizer))
            .with_assessor(Arc::new(BrokenAssessor));
        let opps = vec![opportunity("a", dec!(0.3)), opportunity("b", dec!(0.2))];
        let bundle = composer
            .compose(&opps, &BundleConstraints::default(), CompositionStrategy::Greedy)
            .await
            .unwrap();
        assert_eq!(bundle.size(), 2);
        assert!((bundle.metrics.overall_risk - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn failing_final_validation_marks_bundle_invalid() {
        let composer = composer();
        let constraints = BundleConstraints {
            min_confidence: 0.99,
            ..Default::default()
        };
        let bundle = composer
            .compose(&[opportunity("a", dec!(0.3))], &constraints, CompositionStrategy::Greedy)
            .await
            .unwrap();
        assert!(!bundle.validation.is_valid);
        assert_eq!(composer.stats().await[&CompositionStrategy::Greedy].invalid, 1);
    }
}
