//! Engine orchestration: profit evaluation, composition, inclusion estimate
//! and the submit decision.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::{
    bundle::{BundleComposer, OrderOptimizer, RiskAssessor},
    config::{BundleConstraints, Config},
    errors::{CircuitBreaker, EngineResult},
    factors::FactorEstimator,
    gas::{GasFeeModel, GasOptions},
    market::{HistoricalStats, MarketDataCache, MarketDataProvider},
    montecarlo::MonteCarloEngine,
    network::{NetworkContextProvider, NetworkMonitor},
    profit::{ProfitCalculator, ProfitOptions},
    storage::AuditSink,
    success::SuccessRateEstimator,
    types::{
        ActualOutcome, BundleProfile, ComposedBundle, CompositionStrategy, EngineEvent, EventSink,
        LearningUpdate, NetworkContext, Opportunity, OpportunityKind, PriorityLevel, ProfitResult,
        SuccessEstimation,
    },
    utils::{to_decimal, to_f64},
};

/// Everything the submission layer needs to act on one composed bundle.
#[derive(Debug, Clone, Serialize)]
pub struct BundleDecision {
    pub bundle: ComposedBundle,
    pub success: SuccessEstimation,
    pub profits: Vec<ProfitResult>,
    /// Success probability times bundle net profit, in SOL.
    pub expected_value: Decimal,
    pub submit: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CleanupReport {
    pub competition_pruned: usize,
    pub gas_samples_pruned: usize,
    pub cache_evicted: usize,
    pub predictions_expired: usize,
    pub submissions_expired: usize,
}

#[derive(Debug, Clone)]
struct SubmittedLeg {
    venue: String,
    kind: OpportunityKind,
    estimated_units: u64,
}

#[derive(Debug, Clone)]
struct Submission {
    legs: Vec<SubmittedLeg>,
    decided_at: DateTime<Utc>,
}

impl Submission {
    /// Splits a realized bundle total across legs in proportion to their estimates.
    fn realized_units(&self, total: u64) -> Vec<(&SubmittedLeg, u64)> {
        let estimated: u64 = self.legs.iter().map(|l| l.estimated_units).sum();
        self.legs
            .iter()
            .map(|leg| {
                let share = if estimated > 0 {
                    leg.estimated_units as f64 / estimated as f64
                } else {
                    1.0 / self.legs.len().max(1) as f64
                };
                (leg, (total as f64 * share).round() as u64)
            })
            .collect()
    }
}

pub struct BundleEngine {
    config: Config,
    gas_model: Arc<GasFeeModel>,
    market: Arc<MarketDataCache>,
    history: Arc<HistoricalStats>,
    calculator: ProfitCalculator,
    composer: BundleComposer,
    success: SuccessRateEstimator,
    monitor: Arc<NetworkMonitor>,
    audit: Arc<dyn AuditSink>,
    events: EventSink,
    submissions: RwLock<HashMap<String, Submission>>,
}

impl BundleEngine {
    pub fn new(
        config: Config,
        market_provider: Arc<dyn MarketDataProvider>,
        network_provider: Arc<dyn NetworkContextProvider>,
        audit: Arc<dyn AuditSink>,
        events: EventSink,
    ) -> Self {
        let gas_model = Arc::new(GasFeeModel::new(config.gas.clone()));
        let market = Arc::new(MarketDataCache::new(market_provider, &config.factors));
        let history = Arc::new(HistoricalStats::new());
        let factors = Arc::new(FactorEstimator::new(
            config.factors.clone(),
            Arc::clone(&market),
            Arc::clone(&history),
        ));

        let calculator = ProfitCalculator::new(
            Arc::clone(&gas_model),
            factors,
            MonteCarloEngine::new(config.monte_carlo.clone()),
            Arc::clone(&audit),
            events.clone(),
        )
        .with_persistence(config.engine.enable_persistence);

        let composer = BundleComposer::new(Arc::clone(&gas_model), events.clone());
        let success = SuccessRateEstimator::new(config.success.clone());

        let breaker = CircuitBreaker::new(
            config.engine.max_consecutive_errors,
            Duration::from_secs(config.engine.circuit_breaker_cooldown_secs),
        );
        let monitor = Arc::new(NetworkMonitor::new(
            network_provider,
            Arc::clone(&gas_model),
            breaker,
            events.clone(),
        ));

        Self {
            config,
            gas_model,
            market,
            history,
            calculator,
            composer,
            success,
            monitor,
            audit,
            events,
            submissions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_optimizer(mut self, optimizer: Arc<dyn OrderOptimizer>) -> Self {
        self.composer = self.composer.with_optimizer(optimizer);
        self
    }

    pub fn with_assessor(mut self, assessor: Arc<dyn RiskAssessor>) -> Self {
        self.composer = self.composer.with_assessor(assessor);
        self
    }

    /// Replaces the success estimator, e.g. one restored with persisted weights.
    pub fn with_success_estimator(mut self, estimator: SuccessRateEstimator) -> Self {
        self.success = estimator;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gas_model(&self) -> &Arc<GasFeeModel> {
        &self.gas_model
    }

    pub fn calculator(&self) -> &ProfitCalculator {
        &self.calculator
    }

    pub fn composer(&self) -> &BundleComposer {
        &self.composer
    }

    pub fn success_estimator(&self) -> &SuccessRateEstimator {
        &self.success
    }

    pub fn history(&self) -> &Arc<HistoricalStats> {
        &self.history
    }

    pub async fn refresh_network(&self) -> EngineResult<NetworkContext> {
        self.monitor.refresh().await
    }

    pub async fn evaluate(&self, opportunity: &Opportunity) -> EngineResult<ProfitResult> {
        self.calculator.calculate(opportunity, &ProfitOptions::default()).await
    }

    /// Evaluates every fresh opportunity, composes the profitable ones and
    /// decides whether the resulting bundle is worth submitting.
    pub async fn evaluate_and_compose(
        &self,
        opportunities: &[Opportunity],
        constraints: &BundleConstraints,
        strategy: CompositionStrategy,
    ) -> Option<BundleDecision> {
        let now = Utc::now();
        let fresh: Vec<&Opportunity> = opportunities
            .iter()
            .filter(|o| !o.is_stale(now, constraints.opportunity_ttl_secs))
            .collect();
        if fresh.len() < opportunities.len() {
            debug!("Dropped {} stale opportunities", opportunities.len() - fresh.len());
        }

        for opportunity in &fresh {
            if let Some(token) = opportunity.tokens.first() {
                self.market.record_price(token, to_f64(opportunity.buy_price)).await;
            }
        }

        let options = ProfitOptions {
            now: Some(now),
            ..Default::default()
        };
        let results = join_all(fresh.iter().map(|o| self.calculator.calculate(o, &options))).await;

        let mut profitable = Vec::new();
        let mut profits = Vec::new();
        for (opportunity, result) in fresh.into_iter().zip(results) {
            match result {
                Ok(profit) if profit.is_profitable() => {
                    profitable.push(opportunity.clone());
                    profits.push(profit);
                }
                Ok(profit) => debug!(
                    "Opportunity {} not profitable after risk: {}",
                    opportunity.id, profit.net_profit.risk_adjusted
                ),
                Err(e) => warn!("Skipping opportunity {}: {}", opportunity.id, e),
            }
        }

        let bundle = self
            .composer
            .compose_at(&profitable, constraints, strategy, now)
            .await?;

        let network = self.gas_model.network_snapshot().unwrap_or_default();
        let profile = BundleProfile::from_bundle(&bundle, priority_for(&bundle));
        let success = self.success.estimate(&profile, &network);

        let expected_value = to_decimal(success.success_probability) * bundle.metrics.net_profit;
        let submit = bundle.validation.is_valid
            && expected_value >= self.config.engine.min_expected_value_sol
            && success.success_probability >= self.config.engine.min_success_probability;

        info!(
            "Bundle {} decision: p(success)={:.3} EV={} SOL submit={}",
            bundle.id,
            success.success_probability,
            expected_value.round_dp(6),
            submit
        );

        self.events.emit(EngineEvent::SuccessEstimated {
            bundle_id: bundle.id.clone(),
            success_probability: success.success_probability,
            submit,
        });

        self.submissions.write().await.insert(
            bundle.id.clone(),
            Submission {
                legs: bundle
                    .transactions
                    .iter()
                    .map(|o| SubmittedLeg {
                        venue: o.primary_venue.clone(),
                        kind: o.kind,
                        estimated_units: self.gas_model.estimate(o, &GasOptions::default()).compute_units,
                    })
                    .collect(),
                decided_at: now,
            },
        );

        if self.config.engine.enable_persistence {
            self.persist_decision(bundle.clone(), success.clone());
        }

        let bundle_ids: Vec<&str> = bundle.transactions.iter().map(|o| o.id.as_str()).collect();
        profits.retain(|p| bundle_ids.contains(&p.opportunity_id.as_str()));

        Some(BundleDecision {
            bundle,
            success,
            profits,
            expected_value,
            submit,
        })
    }

    fn persist_decision(&self, bundle: ComposedBundle, success: SuccessEstimation) {
        let audit = Arc::clone(&self.audit);
        tokio::spawn(async move {
            if let Err(e) = audit.record_bundle(&bundle).await {
                warn!("Failed to persist bundle {}: {:#}", bundle.id, e);
            }
            if let Err(e) = audit.record_success(&success).await {
                warn!("Failed to persist success estimation {}: {:#}", success.bundle_id, e);
            }
        });
    }

    /// Learns from a landed or expired bundle: contested opportunities feed
    /// the competition history, consumed compute units feed the gas model.
    pub async fn record_outcome(&self, outcome: &ActualOutcome) -> Option<LearningUpdate> {
        let submission = self.submissions.write().await.remove(&outcome.bundle_id);
        if let Some(submission) = submission {
            let now = Utc::now();
            for leg in &submission.legs {
                self.history.record_competition(leg.kind, !outcome.actual_success, now).await;
            }
            if let Some(total) = outcome.compute_units_consumed {
                for (leg, units) in submission.realized_units(total) {
                    self.gas_model.record_sample(&leg.venue, leg.kind, units, now);
                }
                debug!(
                    "Recorded {} compute units across {} legs of {}",
                    total,
                    submission.legs.len(),
                    outcome.bundle_id
                );
            }
        }

        let update = self.success.record_outcome(outcome)?;
        if update.applied {
            self.events.emit(EngineEvent::ModelUpdated {
                bundle_id: update.bundle_id.clone(),
                error: update.error,
                weights: update.weights,
            });
        }
        Some(update)
    }

    pub async fn cleanup(&self, now: DateTime<Utc>) -> CleanupReport {
        let retention = ChronoDuration::seconds(self.config.engine.history_retention_secs);

        let competition_pruned = self.history.prune(now, retention).await;
        let gas_samples_pruned = self.gas_model.prune_samples(now, retention);
        let cache_evicted = self.market.evict_expired().await;
        let predictions_expired = self.success.prune_pending(now, retention);
        let submissions_expired = {
            let mut submissions = self.submissions.write().await;
            let before = submissions.len();
            submissions.retain(|_, s| now - s.decided_at <= retention);
            before - submissions.len()
        };

        let report = CleanupReport {
            competition_pruned,
            gas_samples_pruned,
            cache_evicted,
            predictions_expired,
            submissions_expired,
        };
        info!(
            "Cleanup: {} competition samples, {} gas samples, {} cache entries, {} predictions, {} submissions removed",
            report.competition_pruned,
            report.gas_samples_pruned,
            report.cache_evicted,
            report.predictions_expired,
            report.submissions_expired
        );
        report
    }

    /// Starts the network refresh and the historical cleanup loops.
    pub fn spawn_background_tasks(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let refresh = Arc::clone(&self.monitor)
            .spawn_refresh(Duration::from_secs(self.config.engine.network_refresh_secs.max(1)));

        let engine = Arc::clone(self);
        let cleanup_every = Duration::from_secs(self.config.engine.history_cleanup_secs.max(1));
        let cleanup = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                engine.cleanup(Utc::now()).await;
            }
        });

        vec![refresh, cleanup]
    }
}

/// Time-sensitive kinds and large bundles bid for higher priority.
pub fn priority_for(bundle: &ComposedBundle) -> PriorityLevel {
    if bundle.metrics.net_profit >= Decimal::ONE {
        PriorityLevel::Critical
    } else if bundle
        .transactions
        .iter()
        .any(|o| matches!(o.kind, OpportunityKind::Liquidation | OpportunityKind::Sandwich))
    {
        PriorityLevel::High
    } else {
        PriorityLevel::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::StaticMarketData;
    use crate::network::StaticNetworkProvider;
    use crate::storage::MemoryAuditSink;
    use crate::test_support::opportunity;
    use rust_decimal_macros::dec;

    fn engine(audit: Arc<MemoryAuditSink>) -> BundleEngine {
        let mut config = Config::default();
        config.monte_carlo.samples = 1_000;
        config.monte_carlo.seed = Some(9);
        let market = StaticMarketData::default()
            .with_liquidity("raydium", 1e9)
            .with_liquidity("orca", 1e9)
            .with_reliability("raydium", 0.99)
            .with_reliability("orca", 0.99)
            .with_prices("SOL", vec![100.0; 30]);
        let network = StaticNetworkProvider::new(NetworkContext {
            network_congestion: 0.2,
            validator_ratio: 0.8,
            ..Default::default()
        });
        BundleEngine::new(config, Arc::new(market), Arc::new(network), audit, EventSink::default())
    }

    fn batch() -> Vec<Opportunity> {
        let mut a = opportunity("a", dec!(0.5));
        a.sell_price = dec!(105);
        let mut b = opportunity("b", dec!(0.4));
        b.sell_price = dec!(104);
        let mut bad = opportunity("bad", dec!(0.3));
        bad.buy_price = dec!(110);
        vec![a, b, bad]
    }

    #[tokio::test]
    async fn composes_decision_from_profitable_opportunities() {
        let audit = Arc::new(MemoryAuditSink::new());
        let engine = engine(audit.clone());
        engine.refresh_network().await.unwrap();

        let decision = engine
            .evaluate_and_compose(&batch(), &BundleConstraints::default(), CompositionStrategy::Greedy)
            .await
            .unwrap();

        assert_eq!(decision.bundle.size(), 2);
        assert_eq!(decision.profits.len(), 2);
        assert!(decision.success.success_probability > 0.0);
        assert_eq!(
            decision.expected_value,
            to_decimal(decision.success.success_probability) * decision.bundle.metrics.net_profit
        );

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(audit.bundles().await.len(), 1);
        assert_eq!(audit.estimations().await.len(), 1);
    }

    #[tokio::test]
    async fn expected_value_gate_blocks_submission() {
        let audit = Arc::new(MemoryAuditSink::new());
        let mut engine = engine(audit);
        engine.config.engine.min_expected_value_sol = dec!(1000);

        let decision = engine
            .evaluate_and_compose(&batch(), &BundleConstraints::default(), CompositionStrategy::Greedy)
            .await
            .unwrap();
        assert!(!decision.submit);
    }

    #[tokio::test]
    async fn nothing_fresh_yields_none() {
        let engine = engine(Arc::new(MemoryAuditSink::new()));
        let mut old = opportunity("old", dec!(0.5));
        old.detected_at = Utc::now() - ChronoDuration::seconds(300);
        assert!(engine
            .evaluate_and_compose(&[old], &BundleConstraints::default(), CompositionStrategy::Greedy)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn outcomes_feed_model_and_competition_history() {
        let engine = engine(Arc::new(MemoryAuditSink::new()));
        let decision = engine
            .evaluate_and_compose(&batch(), &BundleConstraints::default(), CompositionStrategy::Greedy)
            .await
            .unwrap();

        let update = engine
            .record_outcome(&ActualOutcome {
                bundle_id: decision.bundle.id.clone(),
                actual_success: false,
                actual_latency_ms: 900,
                compute_units_consumed: None,
            })
            .await
            .unwrap();
        assert!(update.error < 0.0);
        assert_eq!(engine.history().sample_count(OpportunityKind::Arbitrage).await, 2);

        let report = engine.cleanup(Utc::now() + ChronoDuration::days(2)).await;
        assert_eq!(report.competition_pruned, 2);
    }

    #[tokio::test]
    async fn realized_compute_units_raise_gas_confidence() {
        let engine = engine(Arc::new(MemoryAuditSink::new()));
        let reference = opportunity("reference", dec!(0.5));
        let before = engine.gas_model().estimate(&reference, &GasOptions::default()).estimates.confidence;

        for _ in 0..10 {
            let decision = engine
                .evaluate_and_compose(&batch(), &BundleConstraints::default(), CompositionStrategy::Greedy)
                .await
                .unwrap();
            engine
                .record_outcome(&ActualOutcome {
                    bundle_id: decision.bundle.id.clone(),
                    actual_success: true,
                    actual_latency_ms: 450,
                    compute_units_consumed: Some(360_000),
                })
                .await;
        }

        assert_eq!(engine.gas_model().sample_count("raydium", OpportunityKind::Arbitrage), 20);
        let after = engine.gas_model().estimate(&reference, &GasOptions::default()).estimates.confidence;
        assert!(after > before);

        let report = engine.cleanup(Utc::now() + ChronoDuration::days(2)).await;
        assert_eq!(report.gas_samples_pruned, 1);
        assert_eq!(engine.gas_model().sample_count("raydium", OpportunityKind::Arbitrage), 0);
    }
}
