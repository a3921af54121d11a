//! Bundle Engine - MEV bundle composition and decision engine for Solana
//!
//! Evaluates detected opportunities for risk-adjusted profit, composes them
//! into atomically-submitted bundles under configurable constraints, and
//! predicts each bundle's inclusion probability with an online-learning model.

pub mod config;
pub mod types;
pub mod errors;
pub mod utils;
pub mod gas;
pub mod market;
pub mod factors;
pub mod montecarlo;
pub mod profit;
pub mod bundle;
pub mod success;
pub mod network;
pub mod storage;
pub mod pipeline;

// Re-export commonly used items
pub use config::Config;
pub use errors::{EngineError, EngineResult};
pub use pipeline::{BundleDecision, BundleEngine};
pub use types::*;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use crate::types::{Opportunity, OpportunityKind};

    /// Raydium/Orca SOL-USDC arbitrage with a 1% spread.
    pub fn opportunity(id: &str, profit: Decimal) -> Opportunity {
        Opportunity {
            id: id.to_string(),
            kind: OpportunityKind::Arbitrage,
            primary_venue: "raydium".to_string(),
            secondary_venue: Some("orca".to_string()),
            tokens: vec!["SOL".to_string(), "USDC".to_string()],
            volume: dec!(10),
            buy_price: dec!(100),
            sell_price: dec!(101),
            declared_profit: profit,
            declared_gas_cost: dec!(0.001),
            declared_risk_score: 3.0,
            detected_at: Utc::now(),
        }
    }
}
