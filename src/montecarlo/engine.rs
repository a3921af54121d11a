//! Monte Carlo profit confidence estimation
//!
//! Costs and the combined risk score are perturbed with independent normal
//! draws (Box-Muller); each draw yields one risk-adjusted profit sample.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;
use crate::{
    config::MonteCarloConfig,
    types::{ConfidenceAnalysis, CostFactors, Opportunity, PercentileLadder, RiskFactors},
    utils::{mean, percentile, std_dev, to_f64},
};

pub struct MonteCarloEngine {
    config: MonteCarloConfig,
}

impl MonteCarloEngine {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// `samples` defaults to the configured count.
    pub fn run(
        &self,
        opportunity: &Opportunity,
        costs: &CostFactors,
        risks: &RiskFactors,
        samples: Option<usize>,
    ) -> ConfidenceAnalysis {
        self.simulate(
            opportunity.spread_profit().map(to_f64).unwrap_or(0.0),
            costs,
            risks,
            samples.unwrap_or(self.config.samples),
        )
    }

    pub fn simulate(
        &self,
        base_profit: f64,
        costs: &CostFactors,
        risks: &RiskFactors,
        samples: usize,
    ) -> ConfidenceAnalysis {
        let samples = samples.max(1);
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut outcomes: Vec<f64> = (0..samples)
            .map(|_| {
                let gas = sample_normal(&mut rng, costs.gas.total, costs.gas.variance).max(0.0);
                let slippage =
                    sample_normal(&mut rng, costs.slippage.total, costs.slippage.variance).max(0.0);
                let fees = sample_normal(&mut rng, costs.fees.total, costs.fees.variance).max(0.0);
                let risk = (risks.combined_risk_score
                    + sample_normal(&mut rng, 0.0, self.config.risk_variance))
                .clamp(0.0, 10.0);

                (base_profit - gas - slippage - fees) * (1.0 - risk / 10.0)
            })
            .filter(|v| v.is_finite())
            .collect();

        if outcomes.is_empty() {
            outcomes.push(0.0);
        }
        outcomes.sort_by(|a, b| a.total_cmp(b));

        let level = self.config.confidence_level.clamp(0.5, 0.999);
        let tail = (1.0 - level) / 2.0;
        let profitable = outcomes.iter().filter(|v| **v > 0.0).count() as f64 / outcomes.len() as f64;

        let analysis = ConfidenceAnalysis {
            samples: outcomes.len(),
            confidence_level: level,
            lower_bound: percentile(&outcomes, tail),
            upper_bound: percentile(&outcomes, 1.0 - tail),
            median: percentile(&outcomes, 0.5),
            mean: mean(&outcomes),
            std_dev: std_dev(&outcomes),
            min: outcomes[0],
            max: outcomes[outcomes.len() - 1],
            percentiles: PercentileLadder {
                p5: percentile(&outcomes, 0.05),
                p10: percentile(&outcomes, 0.10),
                p25: percentile(&outcomes, 0.25),
                p75: percentile(&outcomes, 0.75),
                p90: percentile(&outcomes, 0.90),
                p95: percentile(&outcomes, 0.95),
            },
            value_at_risk_95: (-percentile(&outcomes, 0.05)).max(0.0),
            value_at_risk_99: (-percentile(&outcomes, 0.01)).max(0.0),
            profitability_probability: profitable.max(self.config.min_profitability_probability),
        };

        debug!(
            "Monte Carlo: n={} median={:.6} ci=[{:.6}, {:.6}] p(profit)={:.3}",
            analysis.samples,
            analysis.median,
            analysis.lower_bound,
            analysis.upper_bound,
            analysis.profitability_probability
        );

        analysis
    }
}

/// Box-Muller draw from N(mean, variance).
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, variance: f64) -> f64 {
    if !variance.is_finite() || variance <= 0.0 {
        return mean;
    }
    let u1 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + z0 * variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeeCost, GasCost, SlippageCost};

    fn costs() -> CostFactors {
        CostFactors::new(
            GasCost { base: 0.001, total: 0.002, variance: 0.0002f64.powi(2) },
            SlippageCost { primary: 0.01, secondary: 0.01, total: 0.02, variance: 0.005f64.powi(2) },
            FeeCost { total: 0.05, variance: 0.0025f64.powi(2) },
        )
    }

    fn engine(seed: Option<u64>) -> MonteCarloEngine {
        MonteCarloEngine::new(MonteCarloConfig { seed, ..Default::default() })
    }

    #[test]
    fn interval_is_ordered() {
        let risks = RiskFactors::combine(3.0, 0.3, 0.2);
        let analysis = engine(Some(7)).simulate(1.0, &costs(), &risks, 10_000);
        assert!(analysis.lower_bound <= analysis.median);
        assert!(analysis.median <= analysis.upper_bound);
        assert!(analysis.percentiles.p5 <= analysis.percentiles.p25);
        assert!(analysis.percentiles.p75 <= analysis.percentiles.p95);
        assert_eq!(analysis.samples, 10_000);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let risks = RiskFactors::combine(3.0, 0.3, 0.2);
        let a = engine(Some(11)).simulate(1.0, &costs(), &risks, 2_000);
        let b = engine(Some(11)).simulate(1.0, &costs(), &risks, 2_000);
        assert_eq!(a.median, b.median);
        assert_eq!(a.std_dev, b.std_dev);
    }

    #[test]
    fn losing_trade_floors_profitability() {
        let risks = RiskFactors::combine(3.0, 0.3, 0.2);
        let analysis = engine(Some(3)).simulate(0.0, &costs(), &risks, 1_000);
        assert_eq!(analysis.profitability_probability, 0.1);
        assert!(analysis.value_at_risk_95 > 0.0);
        assert!(analysis.value_at_risk_99 >= analysis.value_at_risk_95);
    }

    #[test]
    fn zero_variance_draw_returns_mean() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample_normal(&mut rng, 2.5, 0.0), 2.5);
    }
}
