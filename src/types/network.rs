//! Network condition types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkContext {
    pub current_slot: u64,
    /// 0-1
    pub network_congestion: f64,
    /// Share of stake running a bundle-aware validator client, 0-1.
    pub validator_ratio: f64,
    pub active_validators: u32,
    pub block_time_ms: u64,
    /// Recent average priority fee in SOL.
    pub average_priority_fee: f64,
    pub observed_at: DateTime<Utc>,
}

impl Default for NetworkContext {
    fn default() -> Self {
        Self {
            current_slot: 0,
            network_congestion: 0.5,
            validator_ratio: 0.5,
            active_validators: 1_500,
            block_time_ms: 400,
            average_priority_fee: crate::config::DEFAULT_PRIORITY_FEE_SOL,
            observed_at: Utc::now(),
        }
    }
}

impl NetworkContext {
    pub fn congestion_level(&self) -> CongestionLevel {
        CongestionLevel::from_congestion(self.network_congestion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CongestionLevel {
    Low,
    Normal,
    High,
    Extreme,
}

impl CongestionLevel {
    pub fn from_congestion(congestion: f64) -> Self {
        match congestion {
            c if c < 0.3 => CongestionLevel::Low,
            c if c < 0.6 => CongestionLevel::Normal,
            c if c < 0.85 => CongestionLevel::High,
            _ => CongestionLevel::Extreme,
        }
    }

    pub fn fee_multiplier(&self) -> f64 {
        match self {
            CongestionLevel::Low => 1.0,
            CongestionLevel::Normal => 1.2,
            CongestionLevel::High => 1.6,
            CongestionLevel::Extreme => 2.5,
        }
    }
}
