//! Pre-calculation checks on an opportunity
//!
//! Hard failures are input errors and surface to the caller. Soft findings are
//! returned as warnings; the calculation still runs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use crate::{
    errors::EngineResult,
    types::Opportunity,
};

/// Spread above which a quote is probably a stale or mispriced feed.
const MAX_PLAUSIBLE_SPREAD: Decimal = dec!(0.25);

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub fn validate_for_calculation(
    opportunity: &Opportunity,
    now: DateTime<Utc>,
    ttl_secs: u64,
) -> EngineResult<ValidationReport> {
    opportunity.validate()?;

    let mut report = ValidationReport::default();

    let spread = (opportunity.sell_price - opportunity.buy_price)
        .checked_div(opportunity.buy_price)
        .unwrap_or(Decimal::MAX);
    if spread > MAX_PLAUSIBLE_SPREAD {
        report.warnings.push(format!(
            "Price spread too wide: {:.2}% (max plausible: {}%)",
            spread.saturating_mul(dec!(100)),
            MAX_PLAUSIBLE_SPREAD * dec!(100)
        ));
    }

    if opportunity.is_stale(now, ttl_secs) {
        report.warnings.push(format!(
            "Opportunity is {:.1}s old (ttl {}s)",
            opportunity.age_secs(now),
            ttl_secs
        ));
    }

    if opportunity.declared_gas_cost >= opportunity.declared_profit {
        report.warnings.push("Declared gas cost consumes the declared profit".to_string());
    }

    if !(0.0..=10.0).contains(&opportunity.declared_risk_score) {
        report.warnings.push(format!(
            "Declared risk score {:.2} outside 0-10",
            opportunity.declared_risk_score
        ));
    }

    Ok(report)
}
