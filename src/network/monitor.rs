//! Periodic network snapshot refresh

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use crate::{
    errors::{CircuitBreaker, EngineError, EngineResult},
    gas::GasFeeModel,
    network::{retry_with_backoff, NetworkContextProvider, RetryConfig},
    types::{EngineEvent, EventSink, NetworkContext},
};

/// Pulls snapshots from the provider and pushes them into the gas model.
/// Failed refreshes keep the previous snapshot.
pub struct NetworkMonitor {
    provider: Arc<dyn NetworkContextProvider>,
    gas_model: Arc<GasFeeModel>,
    breaker: CircuitBreaker,
    retry: RetryConfig,
    events: EventSink,
}

impl NetworkMonitor {
    pub fn new(
        provider: Arc<dyn NetworkContextProvider>,
        gas_model: Arc<GasFeeModel>,
        breaker: CircuitBreaker,
        events: EventSink,
    ) -> Self {
        Self {
            provider,
            gas_model,
            breaker,
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 200,
                max_delay_ms: 2_000,
                exponential_base: 2.0,
            },
            events,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub async fn refresh(&self) -> EngineResult<NetworkContext> {
        if !self.breaker.can_proceed().await {
            return Err(EngineError::CircuitBreakerOpen {
                reason: "network refresh failing".to_string(),
                cooldown_remaining: self.breaker.cooldown_remaining().await,
            });
        }

        let provider = Arc::clone(&self.provider);
        let fetched = retry_with_backoff(
            || {
                let provider = Arc::clone(&provider);
                async move { provider.network_context().await }
            },
            &self.retry,
            "network context refresh",
        )
        .await;

        match fetched {
            Ok(context) => {
                self.breaker.record_success().await;
                debug!(
                    "Network refreshed: slot={} congestion={:.2} validators={}",
                    context.current_slot, context.network_congestion, context.active_validators
                );
                self.gas_model.update_network(context.clone());
                self.events.emit(EngineEvent::NetworkRefreshed {
                    slot: context.current_slot,
                    congestion: context.network_congestion,
                });
                Ok(context)
            }
            Err(e) => {
                if self.breaker.record_error().await {
                    error!("Network refresh circuit breaker opened: {}", e);
                } else {
                    warn!("Network refresh failed, keeping previous snapshot: {}", e);
                }
                Err(e)
            }
        }
    }

    pub fn spawn_refresh(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        info!("Starting network refresh every {}s", interval.as_secs());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    debug!("Network refresh skipped: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GasConfig;
    use crate::network::StaticNetworkProvider;
    use async_trait::async_trait;

    struct Offline;

    #[async_trait]
    impl NetworkContextProvider for Offline {
        async fn network_context(&self) -> anyhow::Result<NetworkContext> {
            Err(anyhow::anyhow!("rpc unreachable"))
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 1,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            exponential_base: 1.0,
        }
    }

    #[tokio::test]
    async fn refresh_updates_gas_model_and_notifies() {
        let gas = Arc::new(GasFeeModel::new(GasConfig::default()));
        let (events, mut rx) = EventSink::channel();
        let provider = StaticNetworkProvider::new(NetworkContext {
            current_slot: 42,
            network_congestion: 0.9,
            ..Default::default()
        });
        let monitor = NetworkMonitor::new(
            Arc::new(provider),
            gas.clone(),
            CircuitBreaker::new(3, Duration::from_secs(60)),
            events,
        );

        let context = monitor.refresh().await.unwrap();
        assert_eq!(context.current_slot, 42);
        assert_eq!(gas.network_snapshot().unwrap().current_slot, 42);
        assert!(matches!(rx.try_recv(), Ok(EngineEvent::NetworkRefreshed { slot: 42, .. })));
    }

    #[tokio::test]
    async fn failures_keep_snapshot_and_trip_breaker() {
        let gas = Arc::new(GasFeeModel::new(GasConfig::default()));
        gas.update_network(NetworkContext { current_slot: 7, ..Default::default() });
        let monitor = NetworkMonitor::new(
            Arc::new(Offline),
            gas.clone(),
            CircuitBreaker::new(2, Duration::from_secs(60)),
            EventSink::default(),
        )
        .with_retry(fast_retry());

        assert!(matches!(monitor.refresh().await, Err(EngineError::Network { .. })));
        assert!(matches!(monitor.refresh().await, Err(EngineError::Network { .. })));
        assert!(matches!(monitor.refresh().await, Err(EngineError::CircuitBreakerOpen { .. })));
        assert_eq!(gas.network_snapshot().unwrap().current_slot, 7);
    }
}
