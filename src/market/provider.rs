//! Market data collaborator interface

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;

/// Source of liquidity, reliability and price history. Calls are I/O.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Pool depth for a venue, in quote units.
    async fn liquidity(&self, venue: &str) -> Result<f64>;

    /// Historical fill rate of a venue, 0-1.
    async fn venue_reliability(&self, venue: &str) -> Result<f64>;

    /// Recent prices for a token, oldest first.
    async fn price_history(&self, token: &str) -> Result<Vec<f64>>;
}

/// Fixed in-memory market data. Unknown keys are errors so callers exercise
/// their fallbacks.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    pub liquidity: HashMap<String, f64>,
    pub reliability: HashMap<String, f64>,
    pub prices: HashMap<String, Vec<f64>>,
}

impl StaticMarketData {
    pub fn with_liquidity(mut self, venue: &str, liquidity: f64) -> Self {
        self.liquidity.insert(venue.to_ascii_lowercase(), liquidity);
        self
    }

    pub fn with_reliability(mut self, venue: &str, reliability: f64) -> Self {
        self.reliability.insert(venue.to_ascii_lowercase(), reliability);
        self
    }

    pub fn with_prices(mut self, token: &str, prices: Vec<f64>) -> Self {
        self.prices.insert(token.to_ascii_uppercase(), prices);
        self
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    async fn liquidity(&self, venue: &str) -> Result<f64> {
        self.liquidity
            .get(&venue.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no liquidity data for venue {}", venue))
    }

    async fn venue_reliability(&self, venue: &str) -> Result<f64> {
        self.reliability
            .get(&venue.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no reliability data for venue {}", venue))
    }

    async fn price_history(&self, token: &str) -> Result<Vec<f64>> {
        self.prices
            .get(&token.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no price history for token {}", token))
    }
}

/// Random-walk market used by the demo binary.
#[derive(Debug, Clone)]
pub struct SimulatedMarketData {
    pub base_liquidity: f64,
    pub step_volatility: f64,
}

impl Default for SimulatedMarketData {
    fn default() -> Self {
        Self {
            base_liquidity: 500_000.0,
            step_volatility: 0.004,
        }
    }
}

#[async_trait]
impl MarketDataProvider for SimulatedMarketData {
    async fn liquidity(&self, _venue: &str) -> Result<f64> {
        let jitter = rand::rng().random_range(0.5..1.5);
        Ok(self.base_liquidity * jitter)
    }

    async fn venue_reliability(&self, _venue: &str) -> Result<f64> {
        Ok(rand::rng().random_range(0.8..0.99))
    }

    async fn price_history(&self, _token: &str) -> Result<Vec<f64>> {
        let mut rng = rand::rng();
        let mut price = 100.0;
        let mut prices = Vec::with_capacity(60);
        for _ in 0..60 {
            price *= 1.0 + rng.random_range(-self.step_volatility..self.step_volatility);
            prices.push(price);
        }
        Ok(prices)
    }
}
