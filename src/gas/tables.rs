//! Static compute-unit and fee multiplier tables

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use crate::types::OpportunityKind;

lazy_static! {
    /// Measured compute units for a single swap/instruction on each venue.
    pub static ref VENUE_COMPUTE_UNITS: HashMap<&'static str, u64> = {
        let mut m = HashMap::new();
        m.insert("raydium", 120_000);
        m.insert("raydium_clmm", 180_000);
        m.insert("orca", 100_000);
        m.insert("whirlpool", 140_000);
        m.insert("jupiter", 250_000);
        m.insert("openbook", 150_000);
        m.insert("phoenix", 90_000);
        m.insert("meteora", 160_000);
        m.insert("lifinity", 110_000);
        m.insert("solend", 220_000);
        m.insert("marginfi", 200_000);
        m.insert("kamino", 230_000);
        m
    };

    /// Tokens that attract the most searcher competition.
    pub static ref POPULAR_TOKENS: HashSet<&'static str> = [
        "SOL", "WSOL", "USDC", "USDT", "BONK", "JUP", "WIF", "RAY", "JTO", "MSOL",
    ]
    .into_iter()
    .collect();
}

pub fn venue_compute_units(venue: &str) -> Option<u64> {
    VENUE_COMPUTE_UNITS.get(venue.to_ascii_lowercase().as_str()).copied()
}

pub fn is_known_venue(venue: &str) -> bool {
    venue_compute_units(venue).is_some()
}

pub fn is_popular_token(token: &str) -> bool {
    POPULAR_TOKENS.contains(token.to_ascii_uppercase().as_str())
}

pub fn kind_compute_multiplier(kind: OpportunityKind) -> f64 {
    match kind {
        OpportunityKind::Arbitrage => 1.0,
        OpportunityKind::Sandwich => 1.3,
        OpportunityKind::Liquidation => 1.5,
        OpportunityKind::Flashloan => 1.8,
    }
}

pub fn kind_urgency_multiplier(kind: OpportunityKind) -> f64 {
    match kind {
        OpportunityKind::Liquidation | OpportunityKind::Sandwich => 2.0,
        OpportunityKind::Arbitrage => 1.5,
        OpportunityKind::Flashloan => 1.2,
    }
}
