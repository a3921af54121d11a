//! Success-rate estimator with online learning

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};
use crate::{
    config::SuccessModelConfig,
    success::seasonal::{day_adjustment, hour_adjustment},
    types::{
        ActualOutcome, BundleProfile, LearningUpdate, ModelWeights, NetworkContext, Recommendation,
        SuccessEstimation, SuccessFactors, SuccessFeatures,
    },
    utils::{clamp_probability, mean, percentile_rank},
};

const MIN_WEIGHT: f64 = 0.1;
const MAX_WEIGHT: f64 = 3.0;
const HISTORY_MIN_SAMPLES: usize = 10;
const FULL_CONFIDENCE_SAMPLES: f64 = 100.0;
const REFERENCE_VALIDATOR_COUNT: f64 = 2_000.0;

/// Step contribution of the tip relative to the recent average tip.
pub fn tip_tier(tip_ratio: f64) -> f64 {
    match tip_ratio {
        r if r < 0.5 => -0.3,
        r if r < 1.0 => -0.15,
        r if r < 1.5 => 0.0,
        r if r < 2.5 => 0.2,
        _ => 0.4,
    }
}

fn signum(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
struct PendingPrediction {
    predicted: f64,
    tip: f64,
    tip_signal: f64,
    congestion_signal: f64,
    recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct OutcomeRecord {
    success: bool,
    latency_ms: u64,
}

#[derive(Default)]
struct History {
    tips: VecDeque<f64>,
    outcomes: VecDeque<OutcomeRecord>,
    pending: HashMap<String, PendingPrediction>,
}

pub struct SuccessRateEstimator {
    config: SuccessModelConfig,
    weights: RwLock<ModelWeights>,
    history: Mutex<History>,
}

impl SuccessRateEstimator {
    pub fn new(config: SuccessModelConfig) -> Self {
        Self::with_weights(config, ModelWeights::default())
    }

    /// Restores weights persisted by another process.
    pub fn with_weights(config: SuccessModelConfig, weights: ModelWeights) -> Self {
        Self {
            config,
            weights: RwLock::new(weights),
            history: Mutex::new(History::default()),
        }
    }

    pub fn weights(&self) -> ModelWeights {
        match self.weights.read() {
            Ok(w) => *w,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sample_count(&self) -> usize {
        self.history().outcomes.len()
    }

    pub fn pending_count(&self) -> usize {
        self.history().pending.len()
    }

    /// `None` until enough outcomes were reported.
    pub fn recent_success_rate(&self) -> Option<f64> {
        let history = self.history();
        if history.outcomes.len() < HISTORY_MIN_SAMPLES {
            return None;
        }
        let landed = history.outcomes.iter().filter(|o| o.success).count();
        Some(landed as f64 / history.outcomes.len() as f64)
    }

    pub fn average_latency_ms(&self) -> Option<f64> {
        let history = self.history();
        if history.outcomes.is_empty() {
            return None;
        }
        let latencies: Vec<f64> = history.outcomes.iter().map(|o| o.latency_ms as f64).collect();
        Some(mean(&latencies))
    }

    pub fn average_tip(&self) -> f64 {
        let history = self.history();
        let tips: Vec<f64> = history.tips.iter().copied().collect();
        let average = mean(&tips);
        if average > 0.0 { average } else { self.config.default_average_tip_sol }
    }

    /// Seasonal terms use `network.observed_at`.
    pub fn estimate(&self, bundle: &BundleProfile, network: &NetworkContext) -> SuccessEstimation {
        let weights = self.weights();
        let features = self.features(bundle, network);
        let factors = self.factors(&features, &weights);
        let success_probability = clamp_probability(factors.sum());
        let confidence = self.confidence(&features, network);
        let recommendations = self.recommendations(success_probability, &features, &factors);

        {
            let mut history = self.history();
            history.pending.insert(
                bundle.bundle_id.clone(),
                PendingPrediction {
                    predicted: success_probability,
                    tip: bundle.tip,
                    tip_signal: factors.tip_contribution,
                    congestion_signal: factors.congestion_penalty,
                    recorded_at: Utc::now(),
                },
            );
        }

        debug!(
            "Success estimate {}: p={:.3} confidence={:.2} tip_ratio={:.2} congestion={:.2}",
            bundle.bundle_id, success_probability, confidence, features.tip_ratio, features.network_congestion
        );

        SuccessEstimation {
            bundle_id: bundle.bundle_id.clone(),
            estimated_at: Utc::now(),
            success_probability,
            confidence,
            features,
            factors,
            recommendations,
        }
    }

    fn features(&self, bundle: &BundleProfile, network: &NetworkContext) -> SuccessFeatures {
        let average_tip = self.average_tip();
        let recent_success_rate = self.recent_success_rate().unwrap_or(self.config.base_probability);
        let tips: Vec<f64> = self.history().tips.iter().copied().collect();

        SuccessFeatures {
            bundle_size: bundle.size,
            tip: bundle.tip,
            estimated_gas: bundle.estimated_gas,
            priority: bundle.priority,
            network_congestion: network.network_congestion.clamp(0.0, 1.0),
            validator_ratio: network.validator_ratio.clamp(0.0, 1.0),
            validator_diversity: (network.active_validators as f64 / REFERENCE_VALIDATOR_COUNT).min(1.0),
            hour_of_day: network.observed_at.hour(),
            day_of_week: network.observed_at.weekday().num_days_from_monday(),
            recent_success_rate,
            tip_ratio: if average_tip > 0.0 { bundle.tip / average_tip } else { 1.0 },
            tip_percentile: percentile_rank(&tips, bundle.tip),
        }
    }

    fn factors(&self, features: &SuccessFeatures, weights: &ModelWeights) -> SuccessFactors {
        let extra_txs = features.bundle_size.saturating_sub(self.config.size_penalty_free_txs) as f64;
        let history_adjustment = if self.sample_count() >= HISTORY_MIN_SAMPLES {
            (features.recent_success_rate - 0.5) * 0.2
        } else {
            0.0
        };

        SuccessFactors {
            base: self.config.base_probability,
            tip_contribution: tip_tier(features.tip_ratio) * weights.tip_weight,
            size_penalty: -extra_txs * self.config.size_penalty_per_tx,
            congestion_penalty: -features.network_congestion
                * self.config.congestion_penalty
                * weights.congestion_weight,
            hour_adjustment: hour_adjustment(features.hour_of_day),
            day_adjustment: day_adjustment(features.day_of_week),
            validator_bonus: (features.validator_ratio - 0.5) * 0.2
                + (features.validator_diversity - 0.5) * 0.05,
            priority_boost: features.priority.boost(),
            history_adjustment,
        }
    }

    fn confidence(&self, features: &SuccessFeatures, network: &NetworkContext) -> f64 {
        let samples = (self.sample_count() as f64 / FULL_CONFIDENCE_SAMPLES).min(1.0);
        let mut confidence = self.config.base_confidence + samples * 0.2;

        let target = self.config.target_block_time_ms as f64;
        let block_drift = if target > 0.0 {
            (network.block_time_ms as f64 - target).abs() / target
        } else {
            0.0
        };
        if features.network_congestion < 0.6 && block_drift <= 0.25 {
            confidence += 0.05;
        } else {
            confidence -= 0.05;
        }

        if features.tip_ratio > 5.0 || features.tip_ratio < 0.2 {
            confidence -= 0.15;
        }

        confidence.clamp(0.1, 0.95)
    }

    fn recommendations(
        &self,
        probability: f64,
        features: &SuccessFeatures,
        factors: &SuccessFactors,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();
        if probability >= self.config.recommendation_threshold {
            return recommendations;
        }

        if features.tip_ratio < 1.5 {
            let average_tip = if features.tip_ratio > 0.0 {
                features.tip / features.tip_ratio
            } else {
                self.config.default_average_tip_sol
            };
            recommendations.push(Recommendation::IncreaseTip {
                suggested_tip: average_tip * 2.5,
            });
        }
        if features.bundle_size > self.config.size_penalty_free_txs {
            recommendations.push(Recommendation::ReduceSize {
                target_size: self.config.size_penalty_free_txs,
            });
        }
        if features.network_congestion > 0.7 {
            recommendations.push(Recommendation::WaitForCongestion);
        } else if factors.hour_adjustment < 0.0 {
            recommendations.push(Recommendation::Delay { seconds: 60 });
        }

        recommendations
    }

    /// Feeds a landed/expired bundle back into the model. Unknown bundle ids
    /// are ignored.
    pub fn record_outcome(&self, outcome: &ActualOutcome) -> Option<LearningUpdate> {
        let pending = {
            let mut history = self.history();
            let pending = history.pending.remove(&outcome.bundle_id)?;

            let window = self.config.history_window.max(1);
            history.outcomes.push_back(OutcomeRecord {
                success: outcome.actual_success,
                latency_ms: outcome.actual_latency_ms,
            });
            while history.outcomes.len() > window {
                history.outcomes.pop_front();
            }
            if pending.tip > 0.0 {
                history.tips.push_back(pending.tip);
                while history.tips.len() > window {
                    history.tips.pop_front();
                }
            }
            pending
        };

        let actual = if outcome.actual_success { 1.0 } else { 0.0 };
        let error = actual - pending.predicted;
        let applied = error.abs() > self.config.learning_error_threshold;

        let weights = if applied {
            let mut guard = match self.weights.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let step = error * self.config.learning_rate;
            guard.tip_weight =
                (guard.tip_weight + step * signum(pending.tip_signal)).clamp(MIN_WEIGHT, MAX_WEIGHT);
            guard.congestion_weight = (guard.congestion_weight + step * signum(pending.congestion_signal))
                .clamp(MIN_WEIGHT, MAX_WEIGHT);
            *guard
        } else {
            self.weights()
        };

        if applied {
            info!(
                "Model updated from {}: error={:+.3} tip_weight={:.3} congestion_weight={:.3}",
                outcome.bundle_id, error, weights.tip_weight, weights.congestion_weight
            );
        }

        Some(LearningUpdate {
            bundle_id: outcome.bundle_id.clone(),
            predicted: pending.predicted,
            error,
            applied,
            weights,
        })
    }

    /// Drops predictions whose outcome never arrived.
    pub fn prune_pending(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let mut history = self.history();
        let before = history.pending.len();
        history.pending.retain(|_, p| now - p.recorded_at <= max_age);
        let removed = before - history.pending.len();
        if removed > 0 {
            warn!("Expired {} success predictions without outcomes", removed);
        }
        removed
    }
}
