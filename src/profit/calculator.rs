//! Profit calculation engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;
use crate::{
    config::FactorConfig,
    errors::{EngineError, EngineResult},
    factors::FactorEstimator,
    gas::{GasFeeModel, GasOptions},
    montecarlo::MonteCarloEngine,
    profit::validation::validate_for_calculation,
    storage::AuditSink,
    types::{
        ConfidenceIntervals, CostFactors, EngineEvent, EventSink, GasCost, NetProfit, Opportunity,
        Probabilities, ProfitResult, RiskFactors,
    },
    utils::{to_decimal, to_f64},
};

#[derive(Debug, Clone, Default)]
pub struct ProfitOptions {
    /// Evaluation time; defaults to the wall clock.
    pub now: Option<DateTime<Utc>>,
    pub gas: GasOptions,
    /// Overrides the configured Monte Carlo sample count.
    pub samples: Option<usize>,
}

pub struct ProfitCalculator {
    gas_model: Arc<GasFeeModel>,
    factors: Arc<FactorEstimator>,
    monte_carlo: MonteCarloEngine,
    audit: Arc<dyn AuditSink>,
    events: EventSink,
    persist: bool,
}

impl ProfitCalculator {
    pub fn new(
        gas_model: Arc<GasFeeModel>,
        factors: Arc<FactorEstimator>,
        monte_carlo: MonteCarloEngine,
        audit: Arc<dyn AuditSink>,
        events: EventSink,
    ) -> Self {
        Self {
            gas_model,
            factors,
            monte_carlo,
            audit,
            events,
            persist: true,
        }
    }

    pub fn with_persistence(mut self, enabled: bool) -> Self {
        self.persist = enabled;
        self
    }

    fn factor_config(&self) -> &FactorConfig {
        self.factors.config()
    }

    /// Input errors are the only failures surfaced here.
    pub async fn calculate(
        &self,
        opportunity: &Opportunity,
        options: &ProfitOptions,
    ) -> EngineResult<ProfitResult> {
        let started = Instant::now();
        let now = options.now.unwrap_or_else(Utc::now);

        let report = validate_for_calculation(opportunity, now, self.factor_config().opportunity_ttl_secs)?;
        for warning in &report.warnings {
            warn!("Opportunity {}: {}", opportunity.id, warning);
        }

        let base_profit = opportunity
            .spread_profit()
            .ok_or_else(|| EngineError::InvalidOpportunity {
                id: opportunity.id.clone(),
                reason: "spread profit out of range".to_string(),
            })?;

        let network = self.gas_model.network_snapshot().unwrap_or_else(|e| {
            warn!("Using default network context for {}: {}", opportunity.id, e);
            Default::default()
        });

        let gas = self.gas_model.estimate(opportunity, &options.gas);
        let gas_total = to_f64(gas.total_cost);
        let gas_cost = GasCost {
            base: (gas_total - to_f64(gas.priority_fee)).max(0.0),
            total: gas_total,
            variance: (gas_total * 0.1).powi(2),
        };

        let breakdown = self.factors.estimate(opportunity, &network, now).await;

        let costs = CostFactors::new(gas_cost, breakdown.slippage, breakdown.fees);
        let risks = RiskFactors::combine(
            breakdown.execution_risk,
            breakdown.competition_probability,
            breakdown.volatility.normalized,
        );

        let analysis = self.monte_carlo.run(opportunity, &costs, &risks, options.samples);

        let expected = base_profit - to_decimal(costs.total_costs);
        let risk_factor = to_decimal(1.0 - risks.combined_risk_score / 10.0);
        let lower = to_decimal(analysis.lower_bound);
        let median = to_decimal(analysis.median).max(lower);
        let upper = to_decimal(analysis.upper_bound).max(median);

        let result = ProfitResult {
            id: Uuid::new_v4().to_string(),
            opportunity_id: opportunity.id.clone(),
            calculated_at: now,
            base_profit,
            costs,
            risks,
            net_profit: NetProfit {
                expected,
                risk_adjusted: expected * risk_factor,
                minimum: to_decimal(analysis.min),
                maximum: to_decimal(analysis.max),
            },
            confidence_intervals: ConfidenceIntervals {
                level: analysis.confidence_level,
                lower,
                upper,
                median,
            },
            probabilities: Probabilities {
                profitability: analysis.profitability_probability,
                competition_loss: risks.competition_probability,
                execution_success: 1.0 - risks.execution_risk / 10.0,
            },
            analysis,
            calculation_time_ms: started.elapsed().as_millis() as u64,
        };

        debug!(
            "Profit {}: base={} costs={:.6} risk={:.2} net={} adjusted={} in {}ms",
            opportunity.id,
            result.base_profit,
            result.costs.total_costs,
            result.risks.combined_risk_score,
            result.net_profit.expected,
            result.net_profit.risk_adjusted,
            result.calculation_time_ms
        );

        self.events.emit(EngineEvent::ProfitCalculated {
            opportunity_id: result.opportunity_id.clone(),
            risk_adjusted_profit: result.net_profit.risk_adjusted,
            profitability: result.probabilities.profitability,
        });

        if self.persist {
            self.persist_result(result.clone());
        }

        Ok(result)
    }

    fn persist_result(&self, result: ProfitResult) {
        let audit = Arc::clone(&self.audit);
        tokio::spawn(async move {
            if let Err(e) = audit.record_profit(&result).await {
                warn!("Failed to persist profit result {}: {:#}", result.id, e);
            }
        });
    }
}

/// Sum of risk-adjusted profits, used for headline reporting.
pub fn total_risk_adjusted(results: &[ProfitResult]) -> Decimal {
    results
        .iter()
        .fold(Decimal::ZERO, |total, r| total.saturating_add(r.net_profit.risk_adjusted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GasConfig, MonteCarloConfig};
    use crate::market::{HistoricalStats, MarketDataCache, StaticMarketData};
    use crate::storage::MemoryAuditSink;
    use crate::test_support::opportunity;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use tokio_test::assert_err;

    fn calculator(audit: Arc<dyn AuditSink>, events: EventSink) -> ProfitCalculator {
        let factor_config = FactorConfig::default();
        let data = StaticMarketData::default()
            .with_liquidity("raydium", 1e9)
            .with_liquidity("orca", 1e9)
            .with_prices("SOL", vec![100.0; 20]);
        let cache = Arc::new(MarketDataCache::new(Arc::new(data), &factor_config));
        let factors = Arc::new(FactorEstimator::new(factor_config, cache, Arc::new(HistoricalStats::new())));
        let monte_carlo = MonteCarloEngine::new(MonteCarloConfig {
            samples: 2_000,
            seed: Some(5),
            ..Default::default()
        });
        ProfitCalculator::new(
            Arc::new(GasFeeModel::new(GasConfig::default())),
            factors,
            monte_carlo,
            audit,
            events,
        )
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn record_profit(&self, _: &ProfitResult) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }
        async fn record_bundle(&self, _: &crate::types::ComposedBundle) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }
        async fn record_success(&self, _: &crate::types::SuccessEstimation) -> anyhow::Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    #[tokio::test]
    async fn computes_spread_profit_and_ordered_interval() {
        let sink = Arc::new(MemoryAuditSink::new());
        let calc = calculator(sink.clone(), EventSink::default());
        let opp = opportunity("p", dec!(0.1));

        let result = calc.calculate(&opp, &ProfitOptions::default()).await.unwrap();
        assert_eq!(result.base_profit, dec!(0.1));
        assert!(result.confidence_intervals.lower <= result.confidence_intervals.median);
        assert!(result.confidence_intervals.median <= result.confidence_intervals.upper);
        assert!(result.net_profit.risk_adjusted <= result.net_profit.expected);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(sink.profits().await.len(), 1);
    }

    #[tokio::test]
    async fn rejects_bad_input_synchronously() {
        let calc = calculator(Arc::new(MemoryAuditSink::new()), EventSink::default());
        let mut opp = opportunity("bad", dec!(0.1));
        opp.volume = dec!(0);
        let err = assert_err!(calc.calculate(&opp, &ProfitOptions::default()).await);
        assert!(matches!(err, EngineError::NonPositiveVolume { .. }));
    }

    #[tokio::test]
    async fn rejects_notional_beyond_decimal_range() {
        let calc = calculator(Arc::new(MemoryAuditSink::new()), EventSink::default());
        let mut opp = opportunity("whale", dec!(0.1));
        opp.volume = dec!(10000000000000000000000);
        opp.buy_price = dec!(10000000);
        opp.sell_price = dec!(10000001);
        let err = assert_err!(calc.calculate(&opp, &ProfitOptions::default()).await);
        assert!(matches!(err, EngineError::InvalidOpportunity { .. }));
    }

    #[tokio::test]
    async fn persistence_failure_does_not_fail_calculation() {
        let (events, mut rx) = EventSink::channel();
        let calc = calculator(Arc::new(FailingSink), events);
        let opp = opportunity("p", dec!(0.1));
        assert!(calc.calculate(&opp, &ProfitOptions::default()).await.is_ok());
        assert!(matches!(rx.try_recv(), Ok(EngineEvent::ProfitCalculated { .. })));
    }
}
