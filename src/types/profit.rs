//! Profitability verdict types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::{CostFactors, RiskFactors};

#[derive(Debug, Clone, Serialize)]
pub struct NetProfit {
    pub expected: Decimal,
    pub risk_adjusted: Decimal,
    pub minimum: Decimal,
    pub maximum: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfidenceIntervals {
    pub level: f64,
    pub lower: Decimal,
    pub upper: Decimal,
    pub median: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Probabilities {
    pub profitability: f64,
    pub competition_loss: f64,
    pub execution_success: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PercentileLadder {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// Output of a Monte Carlo run, in SOL.
#[derive(Debug, Clone, Serialize)]
pub struct ConfidenceAnalysis {
    pub samples: usize,
    pub confidence_level: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub median: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: PercentileLadder,
    pub value_at_risk_95: f64,
    pub value_at_risk_99: f64,
    pub profitability_probability: f64,
}

/// Written once to the audit store and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ProfitResult {
    pub id: String,
    pub opportunity_id: String,
    pub calculated_at: DateTime<Utc>,
    pub base_profit: Decimal,
    pub costs: CostFactors,
    pub risks: RiskFactors,
    pub net_profit: NetProfit,
    pub confidence_intervals: ConfidenceIntervals,
    pub probabilities: Probabilities,
    pub analysis: ConfidenceAnalysis,
    pub calculation_time_ms: u64,
}

impl ProfitResult {
    pub fn is_profitable(&self) -> bool {
        self.net_profit.risk_adjusted > Decimal::ZERO
    }
}
