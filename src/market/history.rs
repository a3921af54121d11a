//! Historical competition observations

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use crate::types::OpportunityKind;

const MIN_SAMPLES: usize = 10;
const MAX_SAMPLES_PER_KIND: usize = 1_000;

#[derive(Debug, Clone, Copy)]
struct Observation {
    at: DateTime<Utc>,
    contested: bool,
}

/// Whether past opportunities of each kind were contested by other searchers.
#[derive(Default)]
pub struct HistoricalStats {
    competition: RwLock<HashMap<OpportunityKind, VecDeque<Observation>>>,
}

impl HistoricalStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_competition(&self, kind: OpportunityKind, contested: bool, at: DateTime<Utc>) {
        let mut competition = self.competition.write().await;
        let window = competition.entry(kind).or_default();
        window.push_back(Observation { at, contested });
        while window.len() > MAX_SAMPLES_PER_KIND {
            window.pop_front();
        }
    }

    /// Share of contested observations; `None` while data-starved.
    pub async fn competition_rate(&self, kind: OpportunityKind) -> Option<f64> {
        let competition = self.competition.read().await;
        let window = competition.get(&kind)?;
        if window.len() < MIN_SAMPLES {
            return None;
        }
        let contested = window.iter().filter(|o| o.contested).count();
        Some(contested as f64 / window.len() as f64)
    }

    pub async fn sample_count(&self, kind: OpportunityKind) -> usize {
        self.competition.read().await.get(&kind).map_or(0, |w| w.len())
    }

    /// Drops observations older than `retention`; returns how many were removed.
    pub async fn prune(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let cutoff = now - retention;
        let mut removed = 0;
        let mut competition = self.competition.write().await;
        for window in competition.values_mut() {
            while window.front().is_some_and(|o| o.at < cutoff) {
                window.pop_front();
                removed += 1;
            }
        }
        competition.retain(|_, w| !w.is_empty());
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_requires_minimum_samples() {
        let stats = HistoricalStats::new();
        let now = Utc::now();
        for i in 0..9 {
            stats.record_competition(OpportunityKind::Sandwich, i % 3 == 0, now).await;
        }
        assert!(stats.competition_rate(OpportunityKind::Sandwich).await.is_none());

        stats.record_competition(OpportunityKind::Sandwich, false, now).await;
        let rate = stats.competition_rate(OpportunityKind::Sandwich).await.unwrap();
        assert!((rate - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn prune_removes_old_observations() {
        let stats = HistoricalStats::new();
        let now = Utc::now();
        stats.record_competition(OpportunityKind::Arbitrage, true, now - Duration::hours(10)).await;
        stats.record_competition(OpportunityKind::Arbitrage, true, now).await;
        assert_eq!(stats.prune(now, Duration::hours(6)).await, 1);
        assert_eq!(stats.sample_count(OpportunityKind::Arbitrage).await, 1);
    }
}
