//! Gas & fee model for single operations and whole bundles
//!
//! Estimates never fail: any internal fault produces a conservative fallback
//! with confidence 0.5.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::{debug, warn};
use crate::{
    config::{GasConfig, FALLBACK_CONFIDENCE},
    errors::{EngineError, EngineResult},
    gas::tables::{
        is_known_venue, is_popular_token, kind_compute_multiplier, kind_urgency_multiplier,
        venue_compute_units,
    },
    types::{NetworkContext, Opportunity, OpportunityKind},
    utils::{lamports_to_sol, to_decimal, to_f64},
};

const WELL_SAMPLED: f64 = 50.0;

#[derive(Debug, Clone, Default)]
pub struct GasOptions {
    /// Caller's slippage tolerance; tight tolerances need extra compute for checks.
    pub slippage_tolerance_bps: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GasRange {
    pub min: Decimal,
    pub max: Decimal,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GasEstimate {
    pub compute_units: u64,
    pub priority_fee: Decimal,
    pub total_cost: Decimal,
    pub estimates: GasRange,
    pub is_fallback: bool,
}

impl GasEstimate {
    pub fn fallback(config: &GasConfig) -> Self {
        let total = to_decimal(config.fallback_total_cost_sol);
        Self {
            compute_units: config.fallback_compute_units,
            priority_fee: to_decimal(config.default_priority_fee_sol),
            total_cost: total,
            estimates: GasRange {
                min: total,
                max: total * Decimal::TWO,
                confidence: FALLBACK_CONFIDENCE,
            },
            is_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationCost {
    pub opportunity_id: String,
    pub compute_units: u64,
    pub priority_fee: Decimal,
    pub total_cost: Decimal,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BundleGasEstimate {
    pub total_bundle_cost: Decimal,
    pub per_operation: Vec<OperationCost>,
    pub overhead: Decimal,
    pub optimization_savings: Decimal,
    pub competition_adjustment: Decimal,
    pub total_priority_fee: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
struct SampleStats {
    count: u64,
    mean_units: f64,
    last_seen: Option<DateTime<Utc>>,
}

pub struct GasFeeModel {
    config: GasConfig,
    network: RwLock<NetworkContext>,
    samples: RwLock<HashMap<(String, OpportunityKind), SampleStats>>,
}

impl GasFeeModel {
    pub fn new(config: GasConfig) -> Self {
        Self {
            config,
            network: RwLock::new(NetworkContext::default()),
            samples: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GasConfig {
        &self.config
    }

    /// Replaces the cached network snapshot. Stale snapshots stay usable.
    pub fn update_network(&self, context: NetworkContext) {
        match self.network.write() {
            Ok(mut guard) => *guard = context,
            Err(poisoned) => *poisoned.into_inner() = context,
        }
    }

    pub fn network_snapshot(&self) -> EngineResult<NetworkContext> {
        self.network
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| EngineError::estimation("gas", "network snapshot lock poisoned"))
    }

    /// Records realized compute units for a (venue, kind) pair.
    pub fn record_sample(&self, venue: &str, kind: OpportunityKind, compute_units: u64, at: DateTime<Utc>) {
        let Ok(mut samples) = self.samples.write() else {
            warn!("Gas sample store unavailable, dropping sample for {}", venue);
            return;
        };
        let stats = samples
            .entry((venue.to_ascii_lowercase(), kind))
            .or_default();
        stats.count += 1;
        stats.mean_units += (compute_units as f64 - stats.mean_units) / stats.count as f64;
        stats.last_seen = Some(stats.last_seen.map_or(at, |seen| seen.max(at)));
    }

    /// Forgets (venue, kind) pairs with no sample inside `retention`.
    pub fn prune_samples(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let mut samples = match self.samples.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = samples.len();
        samples.retain(|_, stats| stats.last_seen.is_some_and(|seen| now - seen <= retention));
        before - samples.len()
    }

    pub fn sample_count(&self, venue: &str, kind: OpportunityKind) -> u64 {
        self.samples
            .read()
            .ok()
            .and_then(|s| s.get(&(venue.to_ascii_lowercase(), kind)).map(|st| st.count))
            .unwrap_or(0)
    }

    pub fn estimate(&self, operation: &Opportunity, options: &GasOptions) -> GasEstimate {
        match self.try_estimate(operation, options) {
            Ok(estimate) => estimate,
            Err(e) => {
                warn!("Gas estimate for {} fell back: {}", operation.id, e);
                GasEstimate::fallback(&self.config)
            }
        }
    }

    fn try_estimate(&self, operation: &Opportunity, options: &GasOptions) -> EngineResult<GasEstimate> {
        if operation.primary_venue.trim().is_empty() {
            return Err(EngineError::estimation("gas", "operation has no venue"));
        }
        if operation.volume <= Decimal::ZERO || operation.declared_profit < Decimal::ZERO {
            return Err(EngineError::estimation("gas", "non-positive volume or negative profit"));
        }

        let trade_value = operation
            .trade_value()
            .map(to_f64)
            .ok_or_else(|| EngineError::estimation("gas", "notional value out of range"))?;

        let network = self.network_snapshot()?;
        let samples = self.samples_for(operation)?;
        let compute_units = self.compute_units(operation, trade_value, options, samples);
        let priority_fee = self.priority_fee(operation, trade_value, &network);

        let cu_fee_lamports =
            compute_units as f64 * self.config.compute_unit_price_micro_lamports as f64 / 1_000_000.0;
        let base_cost = lamports_to_sol(self.config.base_fee_lamports as f64 + cu_fee_lamports);
        let network_multiplier = 1.0 + network.network_congestion.clamp(0.0, 1.0);
        let total = base_cost * network_multiplier + priority_fee;

        if !total.is_finite() || total < 0.0 {
            return Err(EngineError::estimation("gas", format!("non-finite total cost {}", total)));
        }

        let confidence = self.confidence(operation, samples);
        let spread = 1.0 - confidence;

        debug!(
            "Gas estimate {}: cu={} priority={:.6} total={:.6} confidence={:.2}",
            operation.id, compute_units, priority_fee, total, confidence
        );

        Ok(GasEstimate {
            compute_units,
            priority_fee: to_decimal(priority_fee),
            total_cost: to_decimal(total),
            estimates: GasRange {
                min: to_decimal(total * (1.0 - spread * 0.5)),
                max: to_decimal(total * (1.0 + spread)),
                confidence,
            },
            is_fallback: false,
        })
    }

    fn samples_for(&self, operation: &Opportunity) -> EngineResult<SampleStats> {
        let samples = self
            .samples
            .read()
            .map_err(|_| EngineError::estimation("gas", "sample store lock poisoned"))?;
        Ok(samples
            .get(&(operation.primary_venue.to_ascii_lowercase(), operation.kind))
            .copied()
            .unwrap_or_default())
    }

    fn compute_units(
        &self,
        operation: &Opportunity,
        trade_value: f64,
        options: &GasOptions,
        samples: SampleStats,
    ) -> u64 {
        let table_units = venue_compute_units(&operation.primary_venue)
            .unwrap_or(self.config.average_compute_units) as f64;
        let sample_weight = (samples.count as f64 / WELL_SAMPLED).min(1.0) * 0.5;
        let base = table_units * (1.0 - sample_weight) + samples.mean_units * sample_weight;

        let mut multiplier = kind_compute_multiplier(operation.kind);

        let extra_tokens = operation.tokens.len().saturating_sub(2) as f64;
        multiplier *= 1.0 + 0.1 * extra_tokens;

        if trade_value > self.config.large_trade_threshold {
            multiplier *= 1.3;
        }
        if options
            .slippage_tolerance_bps
            .is_some_and(|bps| bps < self.config.tight_slippage_bps)
        {
            multiplier *= 1.15;
        }
        if operation.kind == OpportunityKind::Arbitrage && operation.is_cross_venue() {
            multiplier *= 1.2;
        }

        ((base * multiplier).round() as u64).min(self.config.max_compute_units)
    }

    fn priority_fee(&self, operation: &Opportunity, trade_value: f64, network: &NetworkContext) -> f64 {
        let average = if network.average_priority_fee.is_finite() && network.average_priority_fee > 0.0 {
            network.average_priority_fee
        } else {
            self.config.default_priority_fee_sol
        };

        let urgency = kind_urgency_multiplier(operation.kind);
        let congestion = network.congestion_level().fee_multiplier();
        let contested = operation.tokens.iter().any(|t| is_popular_token(t))
            || trade_value > self.config.high_value_threshold;
        let competition = if contested { 2.0 } else { 1.0 };

        let fee = (average * urgency * congestion * competition)
            .clamp(self.config.min_priority_fee_sol, self.config.max_priority_fee_sol);
        fee.max(to_f64(operation.declared_profit) * self.config.priority_fee_profit_floor)
    }

    fn confidence(&self, operation: &Opportunity, samples: SampleStats) -> f64 {
        let mut confidence = 0.6;
        if is_known_venue(&operation.primary_venue) {
            confidence += 0.15;
        }
        confidence += (samples.count as f64 / WELL_SAMPLED).min(1.0) * 0.2;
        confidence.clamp(0.5, 0.95)
    }

    pub fn estimate_bundle(&self, operations: &[Opportunity], options: &GasOptions) -> BundleGasEstimate {
        if operations.is_empty() {
            return BundleGasEstimate::default();
        }

        let per_operation: Vec<OperationCost> = operations
            .iter()
            .map(|op| {
                let estimate = self.estimate(op, options);
                OperationCost {
                    opportunity_id: op.id.clone(),
                    compute_units: estimate.compute_units,
                    priority_fee: estimate.priority_fee,
                    total_cost: estimate.total_cost,
                    confidence: estimate.estimates.confidence,
                }
            })
            .collect();

        let n = operations.len() as f64;
        let raw_total: f64 = per_operation.iter().map(|c| to_f64(c.total_cost)).sum();
        let discounted = raw_total * self.config.bundle_discount;
        let overhead = self.config.bundle_fixed_overhead_sol + self.config.bundle_per_tx_overhead_sol * n;

        let (reused_venues, reused_tokens) = reuse_counts(operations);
        let average_cost = discounted / n;
        let savings = ((reused_venues as f64 * self.config.venue_reuse_saving
            + reused_tokens as f64 * self.config.token_reuse_saving)
            * average_cost)
            .min(discounted * 0.3);

        let bundle_profit: f64 = operations.iter().map(|o| to_f64(o.declared_profit)).sum();
        let competition = if bundle_profit > self.config.competition_surcharge_threshold_sol {
            bundle_profit * self.config.competition_surcharge_rate
        } else {
            0.0
        };

        let total = (discounted + overhead - savings + competition).max(0.0);
        let total_priority_fee = per_operation
            .iter()
            .fold(Decimal::ZERO, |sum, c| sum.saturating_add(c.priority_fee));

        BundleGasEstimate {
            total_bundle_cost: to_decimal(total),
            per_operation,
            overhead: to_decimal(overhead),
            optimization_savings: to_decimal(savings),
            competition_adjustment: to_decimal(competition),
            total_priority_fee,
        }
    }
}

/// Number of repeated venue and token appearances across the bundle.
fn reuse_counts(operations: &[Opportunity]) -> (usize, usize) {
    let mut venues = HashSet::new();
    let mut tokens = HashSet::new();
    let mut reused_venues = 0;
    let mut reused_tokens = 0;

    for op in operations {
        for venue in op.venues() {
            if !venues.insert(venue.to_ascii_lowercase()) {
                reused_venues += 1;
            }
        }
        for token in &op.tokens {
            if !tokens.insert(token.to_ascii_uppercase()) {
                reused_tokens += 1;
            }
        }
    }
    (reused_venues, reused_tokens)
}
