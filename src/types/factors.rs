//! Cost and risk factor types

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GasCost {
    pub base: f64,
    pub total: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SlippageCost {
    pub primary: f64,
    pub secondary: f64,
    pub total: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FeeCost {
    pub total: f64,
    pub variance: f64,
}

/// Per-evaluation cost breakdown, in SOL.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CostFactors {
    pub gas: GasCost,
    pub slippage: SlippageCost,
    pub fees: FeeCost,
    pub total_costs: f64,
}

impl CostFactors {
    pub fn new(gas: GasCost, slippage: SlippageCost, fees: FeeCost) -> Self {
        Self {
            gas,
            slippage,
            fees,
            total_costs: gas.total + slippage.total + fees.total,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RiskFactors {
    /// 0-10
    pub execution_risk: f64,
    /// 0-1
    pub competition_probability: f64,
    /// 0-1, normalized against the reference volatility
    pub volatility: f64,
    /// 0-10
    pub combined_risk_score: f64,
}

impl RiskFactors {
    /// Combined risk = 0.4 execution + 0.3 competition + 0.3 volatility, on a 0-10 scale.
    pub fn combine(execution_risk: f64, competition_probability: f64, volatility: f64) -> Self {
        let execution_risk = execution_risk.clamp(0.0, 10.0);
        let competition_probability = competition_probability.clamp(0.0, 1.0);
        let volatility = volatility.clamp(0.0, 1.0);
        let combined = 0.4 * execution_risk
            + 0.3 * (competition_probability * 10.0)
            + 0.3 * (volatility * 10.0);

        Self {
            execution_risk,
            competition_probability,
            volatility,
            combined_risk_score: combined.clamp(0.0, 10.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PriceTrend {
    Rising,
    Falling,
    Flat,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VolatilityEstimate {
    pub std_dev: f64,
    pub normalized: f64,
    pub trend: f64,
    pub direction: PriceTrend,
    pub samples: usize,
}
