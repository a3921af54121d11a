//! Volatility of recent returns

use std::collections::VecDeque;
use std::time::{Duration, SystemTime};
use tracing::warn;
use crate::{
    types::{PriceTrend, VolatilityEstimate},
    utils::{mean, std_dev},
};

const FLAT_TREND: f64 = 1e-4;

/// Rolling window of observed prices bounded by age.
#[derive(Debug, Clone)]
pub struct VolatilityWindow {
    window: VecDeque<(SystemTime, f64)>,
    max_duration: Duration,
}

impl VolatilityWindow {
    pub fn new(max_duration_secs: u64) -> Self {
        VolatilityWindow {
            window: VecDeque::new(),
            max_duration: Duration::from_secs(max_duration_secs),
        }
    }

    pub fn add_value(&mut self, price: f64) {
        let now = SystemTime::now();
        self.window.push_back((now, price));

        while let Some((timestamp, _)) = self.window.front() {
            if let Ok(duration) = now.duration_since(*timestamp) {
                if duration > self.max_duration {
                    self.window.pop_front();
                } else {
                    break;
                }
            } else {
                warn!("Encountered a timestamp in the future: {:?}", timestamp);
                self.window.pop_front();
            }
        }
    }

    pub fn prices(&self) -> Vec<f64> {
        self.window.iter().map(|(_, price)| *price).collect()
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }
}

/// Std-dev of simple returns normalized against `reference`; trend is
/// mean(second half of returns) minus mean(first half). `None` below three prices.
pub fn estimate_volatility(prices: &[f64], reference: f64) -> Option<VolatilityEstimate> {
    if prices.len() < 3 || reference <= 0.0 {
        return None;
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect();
    if returns.len() < 2 {
        return None;
    }

    let sd = std_dev(&returns);
    let half = returns.len() / 2;
    let trend = mean(&returns[half..]) - mean(&returns[..half]);
    let direction = if trend > FLAT_TREND {
        PriceTrend::Rising
    } else if trend < -FLAT_TREND {
        PriceTrend::Falling
    } else {
        PriceTrend::Flat
    };

    Some(VolatilityEstimate {
        std_dev: sd,
        normalized: (sd / reference).clamp(0.0, 1.0),
        trend,
        direction,
        samples: returns.len(),
    })
}

/// Used when history is too short to measure.
pub fn fallback_volatility(volatility: f64, reference: f64) -> VolatilityEstimate {
    VolatilityEstimate {
        std_dev: volatility,
        normalized: (volatility / reference).clamp(0.0, 1.0),
        trend: 0.0,
        direction: PriceTrend::Flat,
        samples: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_prices_have_zero_volatility() {
        let est = estimate_volatility(&[100.0; 20], 0.1).unwrap();
        assert_eq!(est.std_dev, 0.0);
        assert_eq!(est.normalized, 0.0);
        assert_eq!(est.direction, PriceTrend::Flat);
    }

    #[test]
    fn detects_rising_trend() {
        let prices = [100.0, 100.0, 100.0, 101.0, 103.0, 106.0];
        let est = estimate_volatility(&prices, 0.1).unwrap();
        assert!(est.trend > 0.0);
        assert_eq!(est.direction, PriceTrend::Rising);
        assert!(est.normalized > 0.0 && est.normalized <= 1.0);
    }

    #[test]
    fn wild_swings_saturate_normalization() {
        let prices = [100.0, 150.0, 60.0, 140.0, 50.0];
        assert_eq!(estimate_volatility(&prices, 0.1).unwrap().normalized, 1.0);
        assert!(estimate_volatility(&[1.0, 2.0], 0.1).is_none());
    }

    #[test]
    fn window_keeps_recent_prices() {
        let mut window = VolatilityWindow::new(60);
        window.add_value(1.0);
        window.add_value(2.0);
        assert_eq!(window.prices(), vec![1.0, 2.0]);
        assert_eq!(window.sample_count(), 2);
    }
}
