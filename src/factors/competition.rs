//! Probability that another searcher takes the opportunity first

use chrono::Timelike;
use crate::{
    config::FactorConfig,
    types::{Opportunity, OpportunityKind},
};

/// Trade value at which the volume multiplier doubles the base rate.
const VOLUME_SATURATION: f64 = 100_000.0;

pub fn kind_competition_multiplier(kind: OpportunityKind) -> f64 {
    match kind {
        OpportunityKind::Sandwich => 1.4,
        OpportunityKind::Arbitrage => 1.2,
        OpportunityKind::Liquidation => 1.1,
        OpportunityKind::Flashloan => 0.9,
    }
}

pub fn is_peak_hour(hour: u32, config: &FactorConfig) -> bool {
    let (start, end) = config.peak_hours_utc;
    hour >= start && hour < end
}

/// `historical_rate` is the contested share of past opportunities of the same kind.
pub fn estimate_competition(opportunity: &Opportunity, historical_rate: f64, config: &FactorConfig) -> f64 {
    let peak = if is_peak_hour(opportunity.detected_at.hour(), config) {
        config.peak_hour_multiplier
    } else {
        1.0
    };
    let volume = (1.0 + opportunity.trade_value_f64() / VOLUME_SATURATION).min(2.0);
    let kind = kind_competition_multiplier(opportunity.kind);
    let history = 1.0 + historical_rate.clamp(0.0, 1.0);

    (config.base_competition_rate * peak * volume * kind * history)
        .clamp(0.0, config.max_competition_probability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::opportunity;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn peak_hours_raise_competition() {
        let config = FactorConfig::default();
        let mut opp = opportunity("c", dec!(0.1));
        opp.detected_at = Utc.with_ymd_and_hms(2026, 3, 2, 4, 0, 0).unwrap();
        let quiet = estimate_competition(&opp, 0.0, &config);
        opp.detected_at = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();
        let busy = estimate_competition(&opp, 0.0, &config);
        assert!((busy - quiet * config.peak_hour_multiplier).abs() < 1e-12);
    }

    #[test]
    fn capped_at_configured_maximum() {
        let config = FactorConfig::default();
        let mut opp = opportunity("c", dec!(0.1));
        opp.kind = OpportunityKind::Sandwich;
        opp.volume = dec!(1000000);
        opp.detected_at = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();
        assert_eq!(estimate_competition(&opp, 1.0, &config), config.max_competition_probability);
    }
}
