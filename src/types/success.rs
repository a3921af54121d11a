//! Inclusion-probability estimation types

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use super::ComposedBundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityLevel {
    Low,
    Normal,
    High,
    Critical,
}

impl PriorityLevel {
    pub fn boost(&self) -> f64 {
        match self {
            PriorityLevel::Low => 0.0,
            PriorityLevel::Normal => 0.03,
            PriorityLevel::High => 0.06,
            PriorityLevel::Critical => 0.1,
        }
    }
}

/// What the estimator needs to know about a bundle about to be submitted.
#[derive(Debug, Clone, Serialize)]
pub struct BundleProfile {
    pub bundle_id: String,
    pub size: usize,
    /// SOL
    pub tip: f64,
    /// SOL
    pub estimated_gas: f64,
    pub priority: PriorityLevel,
}

impl BundleProfile {
    pub fn from_bundle(bundle: &ComposedBundle, priority: PriorityLevel) -> Self {
        Self {
            bundle_id: bundle.id.clone(),
            size: bundle.size(),
            tip: bundle.tip.to_f64().unwrap_or(0.0),
            estimated_gas: bundle.metrics.total_gas_cost.to_f64().unwrap_or(0.0),
            priority,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessFeatures {
    pub bundle_size: usize,
    pub tip: f64,
    pub estimated_gas: f64,
    pub priority: PriorityLevel,
    pub network_congestion: f64,
    pub validator_ratio: f64,
    pub validator_diversity: f64,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub recent_success_rate: f64,
    pub tip_ratio: f64,
    pub tip_percentile: f64,
}

/// Additive contributions to the predicted probability.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuccessFactors {
    pub base: f64,
    pub tip_contribution: f64,
    pub size_penalty: f64,
    pub congestion_penalty: f64,
    pub hour_adjustment: f64,
    pub day_adjustment: f64,
    pub validator_bonus: f64,
    pub priority_boost: f64,
    pub history_adjustment: f64,
}

impl SuccessFactors {
    pub fn sum(&self) -> f64 {
        self.base
            + self.tip_contribution
            + self.size_penalty
            + self.congestion_penalty
            + self.hour_adjustment
            + self.day_adjustment
            + self.validator_bonus
            + self.priority_boost
            + self.history_adjustment
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Recommendation {
    IncreaseTip { suggested_tip: f64 },
    ReduceSize { target_size: usize },
    Delay { seconds: u64 },
    WaitForCongestion,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::IncreaseTip { suggested_tip } => {
                write!(f, "increase tip to {:.6} SOL", suggested_tip)
            }
            Recommendation::ReduceSize { target_size } => {
                write!(f, "reduce bundle to {} transactions", target_size)
            }
            Recommendation::Delay { seconds } => write!(f, "delay submission by {}s", seconds),
            Recommendation::WaitForCongestion => f.write_str("wait for congestion to ease"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessEstimation {
    pub bundle_id: String,
    pub estimated_at: DateTime<Utc>,
    pub success_probability: f64,
    pub confidence: f64,
    pub features: SuccessFeatures,
    pub factors: SuccessFactors,
    pub recommendations: Vec<Recommendation>,
}

/// Reported by the outcome tracker once the bundle landed or expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualOutcome {
    pub bundle_id: String,
    pub actual_success: bool,
    pub actual_latency_ms: u64,
    /// Compute units the whole bundle consumed on chain, when known.
    #[serde(default)]
    pub compute_units_consumed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub tip_weight: f64,
    pub congestion_weight: f64,
}

impl Default for ModelWeights {
    fn default() -> Self {
        Self {
            tip_weight: 1.0,
            congestion_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningUpdate {
    pub bundle_id: String,
    pub predicted: f64,
    pub error: f64,
    pub applied: bool,
    pub weights: ModelWeights,
}
