//! Bundle composition types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use super::Opportunity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionStrategy {
    Greedy,
    Balanced,
    RiskAverse,
    Diversified,
    Synergistic,
}

impl CompositionStrategy {
    pub const ALL: [CompositionStrategy; 5] = [
        CompositionStrategy::Greedy,
        CompositionStrategy::Balanced,
        CompositionStrategy::RiskAverse,
        CompositionStrategy::Diversified,
        CompositionStrategy::Synergistic,
    ];
}

impl fmt::Display for CompositionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompositionStrategy::Greedy => "greedy",
            CompositionStrategy::Balanced => "balanced",
            CompositionStrategy::RiskAverse => "risk_averse",
            CompositionStrategy::Diversified => "diversified",
            CompositionStrategy::Synergistic => "synergistic",
        };
        f.write_str(name)
    }
}

impl FromStr for CompositionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "greedy" => Ok(CompositionStrategy::Greedy),
            "balanced" => Ok(CompositionStrategy::Balanced),
            "risk_averse" => Ok(CompositionStrategy::RiskAverse),
            "diversified" => Ok(CompositionStrategy::Diversified),
            "synergistic" => Ok(CompositionStrategy::Synergistic),
            other => Err(format!("unknown composition strategy `{}`", other)),
        }
    }
}

/// Working bundle owned by a strategy while it is being built.
#[derive(Debug, Clone, Default)]
pub struct BundleCandidate {
    pub transactions: Vec<Opportunity>,
    pub estimated_profit: Decimal,
    pub estimated_gas_cost: Decimal,
}

impl BundleCandidate {
    pub fn push(&mut self, opportunity: Opportunity) {
        self.estimated_profit = self.estimated_profit.saturating_add(opportunity.declared_profit);
        self.estimated_gas_cost = self.estimated_gas_cost.saturating_add(opportunity.declared_gas_cost);
        self.transactions.push(opportunity);
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn average_risk(&self) -> f64 {
        if self.transactions.is_empty() {
            return 0.0;
        }
        self.transactions.iter().map(|o| o.declared_risk_score).sum::<f64>()
            / self.transactions.len() as f64
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RiskAssessment {
    pub overall_risk: f64,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleMetrics {
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub total_gas_cost: Decimal,
    /// Gross profit per unit of gas cost.
    pub gas_efficiency: f64,
    pub overall_risk: f64,
    pub confidence_level: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositionInfo {
    pub strategy: CompositionStrategy,
    pub composition_time_ms: u64,
    pub opportunities_considered: usize,
}

/// Terminal artifact handed to submission collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedBundle {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub transactions: Vec<Opportunity>,
    pub metrics: BundleMetrics,
    pub validation: BundleValidation,
    pub composition: CompositionInfo,
    /// Priority fees of the bundle's operations, offered as the bundle tip (SOL).
    pub tip: Decimal,
}

impl ComposedBundle {
    pub fn size(&self) -> usize {
        self.transactions.len()
    }
}
