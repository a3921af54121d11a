//! Detected opportunity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::{
    errors::{EngineError, EngineResult},
    utils::to_f64,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityKind {
    Arbitrage,
    Sandwich,
    Liquidation,
    Flashloan,
}

impl OpportunityKind {
    pub const ALL: [OpportunityKind; 4] = [
        OpportunityKind::Arbitrage,
        OpportunityKind::Sandwich,
        OpportunityKind::Liquidation,
        OpportunityKind::Flashloan,
    ];
}

impl fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpportunityKind::Arbitrage => "arbitrage",
            OpportunityKind::Sandwich => "sandwich",
            OpportunityKind::Liquidation => "liquidation",
            OpportunityKind::Flashloan => "flashloan",
        };
        f.write_str(name)
    }
}

/// A detected opportunity. Produced upstream and never mutated by the engine.
///
/// `volume`, `declared_profit` and `declared_gas_cost` are denominated in SOL;
/// prices are quote units per SOL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub kind: OpportunityKind,
    pub primary_venue: String,
    #[serde(default)]
    pub secondary_venue: Option<String>,
    pub tokens: Vec<String>,
    pub volume: Decimal,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub declared_profit: Decimal,
    pub declared_gas_cost: Decimal,
    pub declared_risk_score: f64,
    pub detected_at: DateTime<Utc>,
}

impl Opportunity {
    /// Parses an untrusted JSON record. Missing fields surface as input errors.
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let opportunity: Opportunity =
            serde_json::from_str(raw).map_err(|e| EngineError::InvalidOpportunity {
                id: "<unparsed>".to_string(),
                reason: e.to_string(),
            })?;
        opportunity.validate()?;
        Ok(opportunity)
    }

    /// Rejects malformed records: missing fields, inverted prices, non-positive volume.
    pub fn validate(&self) -> EngineResult<()> {
        let missing = |field: &str| EngineError::InvalidOpportunity {
            id: self.id.clone(),
            reason: format!("missing field `{}`", field),
        };

        if self.id.trim().is_empty() {
            return Err(missing("id"));
        }
        if self.primary_venue.trim().is_empty() {
            return Err(missing("primaryVenue"));
        }
        if self.tokens.is_empty() || self.tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(missing("tokens"));
        }
        if self.buy_price <= dec!(0) {
            return Err(EngineError::InvalidOpportunity {
                id: self.id.clone(),
                reason: format!("buy price must be positive, got {}", self.buy_price),
            });
        }
        if self.buy_price >= self.sell_price {
            return Err(EngineError::InvertedPrices {
                id: self.id.clone(),
                buy: self.buy_price,
                sell: self.sell_price,
            });
        }
        if self.volume <= dec!(0) {
            return Err(EngineError::NonPositiveVolume {
                id: self.id.clone(),
                volume: self.volume,
            });
        }
        if self.trade_value().is_none() || self.spread_profit().is_none() {
            return Err(EngineError::InvalidOpportunity {
                id: self.id.clone(),
                reason: format!(
                    "notional {} x {} is out of range",
                    self.volume, self.buy_price
                ),
            });
        }
        if !self.declared_risk_score.is_finite() {
            return Err(EngineError::InvalidOpportunity {
                id: self.id.clone(),
                reason: "declared risk score is not finite".to_string(),
            });
        }
        Ok(())
    }

    pub fn age_secs(&self, now: DateTime<Utc>) -> f64 {
        ((now - self.detected_at).num_milliseconds().max(0) as f64) / 1000.0
    }

    pub fn is_stale(&self, now: DateTime<Utc>, ttl_secs: u64) -> bool {
        self.age_secs(now) > ttl_secs as f64
    }

    /// Notional traded value in quote units. `None` on overflow.
    pub fn trade_value(&self) -> Option<Decimal> {
        self.volume.checked_mul(self.buy_price)
    }

    /// Trade value as a statistic input; overflowing notionals saturate.
    pub fn trade_value_f64(&self) -> f64 {
        self.trade_value().map(to_f64).unwrap_or(f64::MAX)
    }

    pub fn venues(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_venue.as_str()).chain(self.secondary_venue.as_deref())
    }

    pub fn is_cross_venue(&self) -> bool {
        self.secondary_venue
            .as_deref()
            .is_some_and(|v| !v.eq_ignore_ascii_case(&self.primary_venue))
    }

    /// Gross profit implied by the price spread: (sell - buy) / buy * volume.
    /// `None` when the arithmetic leaves the decimal range.
    pub fn spread_profit(&self) -> Option<Decimal> {
        if self.buy_price <= Decimal::ZERO {
            return Some(Decimal::ZERO);
        }
        self.sell_price
            .checked_sub(self.buy_price)?
            .checked_div(self.buy_price)?
            .checked_mul(self.volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::opportunity;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn validates_well_formed_opportunity() {
        assert_ok!(opportunity("a", dec!(0.5)).validate());
    }

    #[test]
    fn rejects_inverted_prices_and_zero_volume() {
        let mut inverted = opportunity("a", dec!(0.5));
        inverted.sell_price = inverted.buy_price;
        assert!(matches!(inverted.validate(), Err(EngineError::InvertedPrices { .. })));

        let mut empty = opportunity("b", dec!(0.5));
        empty.volume = dec!(0);
        assert!(matches!(empty.validate(), Err(EngineError::NonPositiveVolume { .. })));
    }

    #[test]
    fn rejects_notional_outside_decimal_range() {
        let mut huge = opportunity("huge", dec!(0.5));
        huge.volume = dec!(10000000000000000000000);
        huge.buy_price = dec!(10000000);
        huge.sell_price = dec!(10000001);
        assert!(huge.trade_value().is_none());
        assert!(matches!(huge.validate(), Err(EngineError::InvalidOpportunity { .. })));
        assert_eq!(huge.trade_value_f64(), f64::MAX);
    }

    #[test]
    fn spread_profit_of_one_percent_spread() {
        assert_eq!(opportunity("a", dec!(0.1)).spread_profit(), Some(dec!(0.1)));
    }

    #[test]
    fn parses_json_and_reports_missing_fields() {
        let good = serde_json::to_string(&opportunity("json", dec!(0.2))).unwrap();
        let parsed = assert_ok!(Opportunity::from_json(&good));
        assert_eq!(parsed.id, "json");

        let err = assert_err!(Opportunity::from_json(r#"{"id":"x","kind":"arbitrage"}"#));
        assert!(err.is_input_error());
    }

    #[test]
    fn staleness_uses_ttl() {
        let mut opp = opportunity("old", dec!(0.2));
        let now = opp.detected_at + chrono::Duration::seconds(31);
        assert!(opp.is_stale(now, 30));
        opp.detected_at = now - chrono::Duration::seconds(5);
        assert!(!opp.is_stale(now, 30));
    }
}
