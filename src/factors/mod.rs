//! Cost and risk factor estimators
//!
//! Each estimator is a pure function of an opportunity and a market snapshot.
//! [`FactorEstimator`] gathers the snapshot through the market cache, runs the
//! four estimators jointly and substitutes documented fallbacks on failure.

pub mod slippage;
pub mod competition;
pub mod execution_risk;
pub mod volatility;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use crate::{
    config::FactorConfig,
    errors::{EngineError, EngineResult},
    market::{HistoricalStats, MarketDataCache},
    types::{FeeCost, NetworkContext, Opportunity, SlippageCost, VolatilityEstimate},
    utils::to_f64,
};

pub use competition::estimate_competition;
pub use execution_risk::{estimate_execution_risk, ExecutionRiskInputs, ExecutionRiskWeights};
pub use slippage::estimate_slippage;
pub use volatility::{estimate_volatility, VolatilityWindow};

#[derive(Debug, Clone, Serialize)]
pub struct FactorBreakdown {
    pub slippage: SlippageCost,
    pub fees: FeeCost,
    pub competition_probability: f64,
    pub execution_risk: f64,
    pub volatility: VolatilityEstimate,
}

pub struct FactorEstimator {
    config: FactorConfig,
    weights: ExecutionRiskWeights,
    cache: Arc<MarketDataCache>,
    history: Arc<HistoricalStats>,
}

impl FactorEstimator {
    pub fn new(config: FactorConfig, cache: Arc<MarketDataCache>, history: Arc<HistoricalStats>) -> Self {
        Self {
            config,
            weights: ExecutionRiskWeights::default(),
            cache,
            history,
        }
    }

    pub fn config(&self) -> &FactorConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<HistoricalStats> {
        &self.history
    }

    pub fn cache(&self) -> &Arc<MarketDataCache> {
        &self.cache
    }

    /// Runs slippage, competition, execution-risk and volatility together.
    pub async fn estimate(
        &self,
        opportunity: &Opportunity,
        network: &NetworkContext,
        now: DateTime<Utc>,
    ) -> FactorBreakdown {
        let (slippage, competition, execution_risk, volatility) = tokio::join!(
            self.slippage(opportunity),
            self.competition(opportunity),
            self.execution_risk(opportunity, network, now),
            self.volatility(opportunity),
        );

        let slippage = slippage.unwrap_or_else(|e| {
            warn!("Slippage estimate for {} fell back: {}", opportunity.id, e);
            SlippageCost::default()
        });
        let competition_probability = competition.unwrap_or_else(|e| {
            warn!("Competition estimate for {} fell back: {}", opportunity.id, e);
            self.config.base_competition_rate
        });
        let execution_risk = execution_risk.unwrap_or_else(|e| {
            warn!("Execution risk for {} fell back: {}", opportunity.id, e);
            self.config.fallback_execution_risk
        });

        let breakdown = FactorBreakdown {
            slippage,
            fees: self.fees(opportunity),
            competition_probability,
            execution_risk,
            volatility,
        };

        debug!(
            "Factors {}: slippage={:.6} fees={:.6} competition={:.3} exec_risk={:.2} vol={:.3}",
            opportunity.id,
            breakdown.slippage.total,
            breakdown.fees.total,
            breakdown.competition_probability,
            breakdown.execution_risk,
            breakdown.volatility.normalized
        );

        breakdown
    }

    /// Falls back to the configured volatility when history is too short.
    pub async fn volatility(&self, opportunity: &Opportunity) -> VolatilityEstimate {
        let token = opportunity.tokens.first().map(String::as_str).unwrap_or_default();
        let prices = self.cache.price_history(token).await;
        estimate_volatility(&prices, self.config.reference_volatility).unwrap_or_else(|| {
            volatility::fallback_volatility(self.config.fallback_volatility, self.config.reference_volatility)
        })
    }

    async fn slippage(&self, opportunity: &Opportunity) -> EngineResult<SlippageCost> {
        let primary = self.cache.liquidity(&opportunity.primary_venue).await;
        let secondary = match &opportunity.secondary_venue {
            Some(venue) => Some(self.cache.liquidity(venue).await),
            None => None,
        };
        let volatility = self.volatility(opportunity).await;

        let cost = estimate_slippage(opportunity, primary, secondary, volatility.normalized, &self.config);
        if !cost.total.is_finite() {
            return Err(EngineError::estimation("slippage", "non-finite slippage"));
        }
        Ok(cost)
    }

    async fn competition(&self, opportunity: &Opportunity) -> EngineResult<f64> {
        let historical = self
            .history
            .competition_rate(opportunity.kind)
            .await
            .unwrap_or(self.config.base_competition_rate);
        let probability = estimate_competition(opportunity, historical, &self.config);
        if !probability.is_finite() {
            return Err(EngineError::estimation("competition", "non-finite probability"));
        }
        Ok(probability)
    }

    async fn execution_risk(
        &self,
        opportunity: &Opportunity,
        network: &NetworkContext,
        now: DateTime<Utc>,
    ) -> EngineResult<f64> {
        let mut liquidity = f64::INFINITY;
        let mut reliability: f64 = 1.0;
        for venue in opportunity.venues() {
            liquidity = liquidity.min(self.cache.liquidity(venue).await);
            reliability = reliability.min(self.cache.venue_reliability(venue).await);
        }
        let volatility = self.volatility(opportunity).await;

        let inputs = ExecutionRiskInputs {
            network_congestion: network.network_congestion,
            trade_value: opportunity.trade_value_f64(),
            liquidity,
            volatility: volatility.normalized,
            venue_reliability: reliability,
            age_secs: opportunity.age_secs(now),
            ttl_secs: self.config.opportunity_ttl_secs as f64,
        };
        Ok(estimate_execution_risk(&inputs, &self.weights))
    }

    /// Venue trading fees on both legs, in SOL.
    pub fn fees(&self, opportunity: &Opportunity) -> FeeCost {
        let per_leg = to_f64(opportunity.volume) * self.config.venue_fee_bps / 10_000.0;
        let total = per_leg * 2.0;
        FeeCost {
            total,
            variance: (total * 0.05).powi(2),
        }
    }
}
