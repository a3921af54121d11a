//! Execution risk on a 0-10 scale

use serde::Serialize;

/// Trade/liquidity ratio treated as fully thin.
const THIN_LIQUIDITY_RATIO: f64 = 0.1;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExecutionRiskWeights {
    pub congestion: f64,
    pub liquidity: f64,
    pub volatility: f64,
    pub venue: f64,
    pub age: f64,
}

impl Default for ExecutionRiskWeights {
    fn default() -> Self {
        Self {
            congestion: 0.25,
            liquidity: 0.25,
            volatility: 0.2,
            venue: 0.15,
            age: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutionRiskInputs {
    /// 0-1
    pub network_congestion: f64,
    /// Quote units
    pub trade_value: f64,
    /// Quote units, shallowest leg
    pub liquidity: f64,
    /// 0-1 normalized
    pub volatility: f64,
    /// 0-1, lowest across venues
    pub venue_reliability: f64,
    pub age_secs: f64,
    pub ttl_secs: f64,
}

pub fn estimate_execution_risk(inputs: &ExecutionRiskInputs, weights: &ExecutionRiskWeights) -> f64 {
    let congestion = inputs.network_congestion.clamp(0.0, 1.0) * 10.0;
    let thinness = if inputs.liquidity > 0.0 {
        ((inputs.trade_value / inputs.liquidity) / THIN_LIQUIDITY_RATIO).clamp(0.0, 1.0) * 10.0
    } else {
        10.0
    };
    let volatility = inputs.volatility.clamp(0.0, 1.0) * 10.0;
    let venue = (1.0 - inputs.venue_reliability.clamp(0.0, 1.0)) * 10.0;
    let age = if inputs.ttl_secs > 0.0 {
        (inputs.age_secs / inputs.ttl_secs).clamp(0.0, 1.0) * 10.0
    } else {
        10.0
    };

    let risk = weights.congestion * congestion
        + weights.liquidity * thinness
        + weights.volatility * volatility
        + weights.venue * venue
        + weights.age * age;

    if risk.is_finite() { risk.clamp(0.0, 10.0) } else { 10.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> ExecutionRiskInputs {
        ExecutionRiskInputs {
            network_congestion: 0.5,
            trade_value: 1_000.0,
            liquidity: 1_000_000.0,
            volatility: 0.2,
            venue_reliability: 0.9,
            age_secs: 3.0,
            ttl_secs: 30.0,
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let w = ExecutionRiskWeights::default();
        assert!((w.congestion + w.liquidity + w.volatility + w.venue + w.age - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bounded_between_zero_and_ten() {
        let w = ExecutionRiskWeights::default();
        let worst = ExecutionRiskInputs {
            network_congestion: 5.0,
            trade_value: 1e12,
            liquidity: 0.0,
            volatility: 3.0,
            venue_reliability: -1.0,
            age_secs: 1e6,
            ttl_secs: 30.0,
        };
        assert_eq!(estimate_execution_risk(&worst, &w), 10.0);
        let r = estimate_execution_risk(&inputs(), &w);
        assert!(r > 0.0 && r < 10.0);
    }

    #[test]
    fn larger_trades_are_riskier() {
        let w = ExecutionRiskWeights::default();
        let small = estimate_execution_risk(&inputs(), &w);
        let big = estimate_execution_risk(&ExecutionRiskInputs { trade_value: 50_000.0, ..inputs() }, &w);
        assert!(big > small);
    }
}
