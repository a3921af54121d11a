//! TTL-invalidated market snapshot cache

use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use crate::{
    config::FactorConfig,
    factors::volatility::VolatilityWindow,
    market::MarketDataProvider,
};

const MIN_OBSERVED_PRICES: usize = 10;

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

type CacheMap<T> = RwLock<HashMap<String, Cached<T>>>;

pub struct MarketDataCache {
    provider: Arc<dyn MarketDataProvider>,
    ttl: Duration,
    default_liquidity: f64,
    default_reliability: f64,
    liquidity: CacheMap<f64>,
    reliability: CacheMap<f64>,
    prices: CacheMap<Vec<f64>>,
    observed: RwLock<HashMap<String, VolatilityWindow>>,
}

impl MarketDataCache {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: &FactorConfig) -> Self {
        Self {
            provider,
            ttl: Duration::from_secs(config.cache_ttl_secs),
            default_liquidity: config.default_liquidity,
            default_reliability: config.default_venue_reliability,
            liquidity: RwLock::new(HashMap::new()),
            reliability: RwLock::new(HashMap::new()),
            prices: RwLock::new(HashMap::new()),
            observed: RwLock::new(HashMap::new()),
        }
    }

    pub async fn liquidity(&self, venue: &str) -> f64 {
        let key = venue.to_ascii_lowercase();
        let fetched = cached_or_fetch(&self.liquidity, &key, self.ttl, || {
            self.provider.liquidity(venue)
        })
        .await;

        match fetched {
            Ok(liquidity) if liquidity.is_finite() && liquidity > 0.0 => liquidity,
            Ok(liquidity) => {
                warn!("Ignoring invalid liquidity {} for {}", liquidity, venue);
                self.default_liquidity
            }
            Err(e) => {
                debug!("Liquidity lookup for {} failed, using default: {}", venue, e);
                self.default_liquidity
            }
        }
    }

    pub async fn venue_reliability(&self, venue: &str) -> f64 {
        let key = venue.to_ascii_lowercase();
        let fetched = cached_or_fetch(&self.reliability, &key, self.ttl, || {
            self.provider.venue_reliability(venue)
        })
        .await;

        match fetched {
            Ok(reliability) if reliability.is_finite() => reliability.clamp(0.0, 1.0),
            Ok(_) => self.default_reliability,
            Err(e) => {
                debug!("Reliability lookup for {} failed, using default: {}", venue, e);
                self.default_reliability
            }
        }
    }

    /// Locally observed prices win once enough have been recorded.
    pub async fn price_history(&self, token: &str) -> Vec<f64> {
        let key = token.to_ascii_uppercase();

        if let Some(window) = self.observed.read().await.get(&key) {
            if window.sample_count() >= MIN_OBSERVED_PRICES {
                return window.prices();
            }
        }

        match cached_or_fetch(&self.prices, &key, self.ttl, || self.provider.price_history(token)).await {
            Ok(prices) => prices.into_iter().filter(|p| p.is_finite() && *p > 0.0).collect(),
            Err(e) => {
                debug!("Price history for {} unavailable: {}", token, e);
                Vec::new()
            }
        }
    }

    pub async fn record_price(&self, token: &str, price: f64) {
        if !price.is_finite() || price <= 0.0 {
            return;
        }
        self.observed
            .write()
            .await
            .entry(token.to_ascii_uppercase())
            .or_insert_with(|| VolatilityWindow::new(3_600))
            .add_value(price);
    }

    /// Drops expired entries; returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut removed = 0;
        removed += evict(&self.liquidity, ttl).await;
        removed += evict(&self.reliability, ttl).await;
        removed += evict(&self.prices, ttl).await;
        removed
    }
}

async fn cached_or_fetch<T, F, Fut>(map: &CacheMap<T>, key: &str, ttl: Duration, fetch: F) -> Result<T>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Some(entry) = map.read().await.get(key) {
        if entry.fetched_at.elapsed() < ttl {
            return Ok(entry.value.clone());
        }
    }

    let value = fetch().await?;
    map.write().await.insert(
        key.to_string(),
        Cached {
            value: value.clone(),
            fetched_at: Instant::now(),
        },
    );
    Ok(value)
}

async fn evict<T>(map: &CacheMap<T>, ttl: Duration) -> usize {
    let mut guard = map.write().await;
    let before = guard.len();
    guard.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
    before - guard.len()
}
