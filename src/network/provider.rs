//! Network-condition sources

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use crate::types::NetworkContext;

#[async_trait]
pub trait NetworkContextProvider: Send + Sync {
    async fn network_context(&self) -> Result<NetworkContext>;
}

/// Always reports the same snapshot, re-stamped with the current time.
#[derive(Debug, Clone, Default)]
pub struct StaticNetworkProvider {
    pub context: NetworkContext,
}

impl StaticNetworkProvider {
    pub fn new(context: NetworkContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl NetworkContextProvider for StaticNetworkProvider {
    async fn network_context(&self) -> Result<NetworkContext> {
        Ok(NetworkContext {
            observed_at: Utc::now(),
            ..self.context.clone()
        })
    }
}

/// Advancing slots with jittered congestion, for the demo binary.
pub struct SimulatedNetwork {
    slot: AtomicU64,
    pub mean_congestion: f64,
}

impl SimulatedNetwork {
    pub fn new(start_slot: u64, mean_congestion: f64) -> Self {
        Self {
            slot: AtomicU64::new(start_slot),
            mean_congestion: mean_congestion.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self::new(250_000_000, 0.45)
    }
}

#[async_trait]
impl NetworkContextProvider for SimulatedNetwork {
    async fn network_context(&self) -> Result<NetworkContext> {
        let mut rng = rand::rng();
        let slot = self.slot.fetch_add(rng.random_range(50..100), Ordering::Relaxed);
        let congestion = (self.mean_congestion + rng.random_range(-0.2..0.2)).clamp(0.0, 1.0);

        Ok(NetworkContext {
            current_slot: slot,
            network_congestion: congestion,
            validator_ratio: rng.random_range(0.55..0.9),
            active_validators: rng.random_range(1_300..1_600),
            block_time_ms: 400 + (congestion * 200.0) as u64,
            average_priority_fee: crate::config::DEFAULT_PRIORITY_FEE_SOL * (1.0 + congestion),
            observed_at: Utc::now(),
        })
    }
}
