//! Incremental and final bundle checks

use rust_decimal::Decimal;
use std::fmt;
use crate::{
    config::BundleConstraints,
    types::{BundleCandidate, BundleMetrics, Opportunity},
    utils::to_f64,
};

#[derive(Debug, Clone, PartialEq)]
pub enum AdditionRejection {
    BundleFull { max: usize },
    BelowMinProfit { net_profit: Decimal, threshold: Decimal },
    GasRatioExceeded { ratio: f64, max: f64 },
    RiskTooHigh { average: f64, max: f64 },
}

impl fmt::Display for AdditionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdditionRejection::BundleFull { max } => write!(f, "bundle already holds {} transactions", max),
            AdditionRejection::BelowMinProfit { net_profit, threshold } => {
                write!(f, "net profit {} below threshold {}", net_profit, threshold)
            }
            AdditionRejection::GasRatioExceeded { ratio, max } => {
                write!(f, "gas/profit ratio {:.3} above {:.3}", ratio, max)
            }
            AdditionRejection::RiskTooHigh { average, max } => {
                write!(f, "average risk {:.2} above {:.2}", average, max)
            }
        }
    }
}

/// Checks the bundle as it would look with `next` appended.
pub fn validate_addition(
    candidate: &BundleCandidate,
    next: &Opportunity,
    constraints: &BundleConstraints,
) -> Result<(), AdditionRejection> {
    let size = candidate.len() + 1;
    if size > constraints.max_bundle_size {
        return Err(AdditionRejection::BundleFull { max: constraints.max_bundle_size });
    }

    let profit = candidate.estimated_profit.saturating_add(next.declared_profit);
    let gas = candidate.estimated_gas_cost.saturating_add(next.declared_gas_cost);
    let net_profit = profit.saturating_sub(gas);
    if net_profit < constraints.min_profit_threshold {
        return Err(AdditionRejection::BelowMinProfit {
            net_profit,
            threshold: constraints.min_profit_threshold,
        });
    }

    let ratio = if profit > Decimal::ZERO {
        gas.checked_div(profit).map(to_f64).unwrap_or(f64::INFINITY)
    } else {
        f64::INFINITY
    };
    if ratio > constraints.max_gas_to_profit_ratio {
        return Err(AdditionRejection::GasRatioExceeded {
            ratio,
            max: constraints.max_gas_to_profit_ratio,
        });
    }

    let average = (candidate.average_risk() * candidate.len() as f64 + next.declared_risk_score) / size as f64;
    if average > constraints.max_risk_score {
        return Err(AdditionRejection::RiskTooHigh {
            average,
            max: constraints.max_risk_score,
        });
    }

    Ok(())
}

/// Issues that make a composed bundle unfit for submission.
pub fn final_issues(size: usize, metrics: &BundleMetrics, constraints: &BundleConstraints) -> Vec<String> {
    let mut issues = Vec::new();

    if size == 0 {
        issues.push("Bundle is empty".to_string());
    }
    if size > constraints.max_bundle_size {
        issues.push(format!("Bundle size {} exceeds maximum {}", size, constraints.max_bundle_size));
    }
    if metrics.net_profit < constraints.min_profit_threshold {
        issues.push(format!(
            "Net profit {} below minimum {}",
            metrics.net_profit.round_dp(6),
            constraints.min_profit_threshold
        ));
    }
    if metrics.overall_risk > constraints.max_risk_score {
        issues.push(format!(
            "Overall risk {:.2} exceeds maximum {:.2}",
            metrics.overall_risk, constraints.max_risk_score
        ));
    }
    if metrics.confidence_level < constraints.min_confidence {
        issues.push(format!(
            "Confidence {:.2} below minimum {:.2}",
            metrics.confidence_level, constraints.min_confidence
        ));
    }

    issues
}
