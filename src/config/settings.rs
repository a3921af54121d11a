//! Engine configuration settings and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;

// Composition constants
pub const DEFAULT_MAX_BUNDLE_SIZE: usize = 5;
pub const MAX_BUNDLE_SIZE_LIMIT: usize = 10;
pub const DEFAULT_MIN_PROFIT_SOL: Decimal = dec!(0.01);
pub const DEFAULT_MAX_RISK_SCORE: f64 = 7.0;
pub const DEFAULT_MAX_GAS_TO_PROFIT_RATIO: f64 = 0.5;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
pub const RISK_AVERSE_MAX_RISK: f64 = 5.0;

// Gas & fee constants (Solana units)
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;
pub const BASE_FEE_LAMPORTS: u64 = 5_000;
pub const DEFAULT_COMPUTE_UNITS: u64 = 200_000;
pub const MAX_COMPUTE_UNITS: u64 = 1_400_000;
pub const DEFAULT_CU_PRICE_MICRO_LAMPORTS: u64 = 1_000;
pub const DEFAULT_PRIORITY_FEE_SOL: f64 = 0.0001;
pub const MIN_PRIORITY_FEE_SOL: f64 = 0.00001;
pub const MAX_PRIORITY_FEE_SOL: f64 = 0.01;
pub const PRIORITY_FEE_PROFIT_FLOOR: f64 = 0.10;
pub const LARGE_TRADE_THRESHOLD: f64 = 10_000.0;
pub const HIGH_VALUE_THRESHOLD: f64 = 50_000.0;
pub const TIGHT_SLIPPAGE_BPS: u32 = 50;
pub const FALLBACK_COMPUTE_UNITS: u64 = 400_000;
pub const FALLBACK_TOTAL_COST_SOL: f64 = 0.005;
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

// Factor estimator constants
pub const DEFAULT_BASE_SLIPPAGE_BPS: f64 = 30.0;
pub const MAX_PRICE_IMPACT: f64 = 0.5;
pub const DEFAULT_VENUE_FEE_BPS: f64 = 25.0;
pub const DEFAULT_LIQUIDITY: f64 = 100_000.0;
pub const DEFAULT_VENUE_RELIABILITY: f64 = 0.9;
pub const BASE_COMPETITION_RATE: f64 = 0.3;
pub const MAX_COMPETITION_PROBABILITY: f64 = 0.9;
pub const REFERENCE_VOLATILITY: f64 = 0.1;
pub const FALLBACK_VOLATILITY: f64 = 0.02;
pub const FALLBACK_EXECUTION_RISK: f64 = 5.0;
pub const MARKET_CACHE_TTL_SECS: u64 = 10;

// Monte Carlo constants
pub const DEFAULT_MONTE_CARLO_SAMPLES: usize = 10_000;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
pub const RISK_PERTURBATION_VARIANCE: f64 = 0.25;
pub const MIN_PROFITABILITY_PROBABILITY: f64 = 0.1;

// Success model constants
pub const BASE_SUCCESS_PROBABILITY: f64 = 0.5;
pub const DEFAULT_LEARNING_RATE: f64 = 0.05;
pub const LEARNING_ERROR_THRESHOLD: f64 = 0.1;
pub const BASE_PREDICTION_CONFIDENCE: f64 = 0.7;
pub const RECOMMENDATION_THRESHOLD: f64 = 0.6;
pub const DEFAULT_AVERAGE_TIP_SOL: f64 = 0.0005;
pub const HISTORY_WINDOW: usize = 500;

// Orchestration constants
pub const OPPORTUNITY_TTL_SECS: u64 = 30;
pub const NETWORK_REFRESH_SECS: u64 = 30;
pub const HISTORY_CLEANUP_SECS: u64 = 3_600;
pub const HISTORY_RETENTION_SECS: i64 = 6 * 3_600;
pub const DEFAULT_MIN_SUCCESS_PROBABILITY: f64 = 0.3;
pub const DEFAULT_MIN_EXPECTED_VALUE_SOL: Decimal = dec!(0.005);

#[derive(Debug, Clone)]
pub struct GasConfig {
    pub base_fee_lamports: u64,
    pub average_compute_units: u64,
    pub max_compute_units: u64,
    pub compute_unit_price_micro_lamports: u64,
    pub default_priority_fee_sol: f64,
    pub min_priority_fee_sol: f64,
    pub max_priority_fee_sol: f64,
    pub priority_fee_profit_floor: f64,
    pub large_trade_threshold: f64,
    pub high_value_threshold: f64,
    pub tight_slippage_bps: u32,
    pub bundle_discount: f64,
    pub bundle_fixed_overhead_sol: f64,
    pub bundle_per_tx_overhead_sol: f64,
    pub venue_reuse_saving: f64,
    pub token_reuse_saving: f64,
    pub competition_surcharge_threshold_sol: f64,
    pub competition_surcharge_rate: f64,
    pub fallback_compute_units: u64,
    pub fallback_total_cost_sol: f64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            base_fee_lamports: BASE_FEE_LAMPORTS,
            average_compute_units: DEFAULT_COMPUTE_UNITS,
            max_compute_units: MAX_COMPUTE_UNITS,
            compute_unit_price_micro_lamports: DEFAULT_CU_PRICE_MICRO_LAMPORTS,
            default_priority_fee_sol: DEFAULT_PRIORITY_FEE_SOL,
            min_priority_fee_sol: MIN_PRIORITY_FEE_SOL,
            max_priority_fee_sol: MAX_PRIORITY_FEE_SOL,
            priority_fee_profit_floor: PRIORITY_FEE_PROFIT_FLOOR,
            large_trade_threshold: LARGE_TRADE_THRESHOLD,
            high_value_threshold: HIGH_VALUE_THRESHOLD,
            tight_slippage_bps: TIGHT_SLIPPAGE_BPS,
            bundle_discount: 0.9,
            bundle_fixed_overhead_sol: 0.00001,
            bundle_per_tx_overhead_sol: 0.000005,
            venue_reuse_saving: 0.05,
            token_reuse_saving: 0.03,
            competition_surcharge_threshold_sol: 1.0,
            competition_surcharge_rate: 0.01,
            fallback_compute_units: FALLBACK_COMPUTE_UNITS,
            fallback_total_cost_sol: FALLBACK_TOTAL_COST_SOL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FactorConfig {
    pub base_slippage_bps: f64,
    pub max_price_impact: f64,
    pub venue_fee_bps: f64,
    pub default_liquidity: f64,
    pub default_venue_reliability: f64,
    pub base_competition_rate: f64,
    pub peak_hours_utc: (u32, u32),
    pub peak_hour_multiplier: f64,
    pub max_competition_probability: f64,
    pub reference_volatility: f64,
    pub fallback_volatility: f64,
    pub fallback_execution_risk: f64,
    pub opportunity_ttl_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            base_slippage_bps: DEFAULT_BASE_SLIPPAGE_BPS,
            max_price_impact: MAX_PRICE_IMPACT,
            venue_fee_bps: DEFAULT_VENUE_FEE_BPS,
            default_liquidity: DEFAULT_LIQUIDITY,
            default_venue_reliability: DEFAULT_VENUE_RELIABILITY,
            base_competition_rate: BASE_COMPETITION_RATE,
            peak_hours_utc: (13, 21),
            peak_hour_multiplier: 1.5,
            max_competition_probability: MAX_COMPETITION_PROBABILITY,
            reference_volatility: REFERENCE_VOLATILITY,
            fallback_volatility: FALLBACK_VOLATILITY,
            fallback_execution_risk: FALLBACK_EXECUTION_RISK,
            opportunity_ttl_secs: OPPORTUNITY_TTL_SECS,
            cache_ttl_secs: MARKET_CACHE_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonteCarloConfig {
    pub samples: usize,
    pub confidence_level: f64,
    pub risk_variance: f64,
    pub min_profitability_probability: f64,
    /// Fixed seed for reproducible runs; `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_MONTE_CARLO_SAMPLES,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            risk_variance: RISK_PERTURBATION_VARIANCE,
            min_profitability_probability: MIN_PROFITABILITY_PROBABILITY,
            seed: None,
        }
    }
}

/// Limits a composed bundle must respect.
#[derive(Debug, Clone)]
pub struct BundleConstraints {
    pub max_bundle_size: usize,
    pub min_profit_threshold: Decimal,
    pub max_risk_score: f64,
    pub max_gas_to_profit_ratio: f64,
    pub min_confidence: f64,
    /// `None` allows every venue.
    pub allowed_venues: Option<Vec<String>>,
    pub opportunity_ttl_secs: u64,
}

impl Default for BundleConstraints {
    fn default() -> Self {
        Self {
            max_bundle_size: DEFAULT_MAX_BUNDLE_SIZE,
            min_profit_threshold: DEFAULT_MIN_PROFIT_SOL,
            max_risk_score: DEFAULT_MAX_RISK_SCORE,
            max_gas_to_profit_ratio: DEFAULT_MAX_GAS_TO_PROFIT_RATIO,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            allowed_venues: None,
            opportunity_ttl_secs: OPPORTUNITY_TTL_SECS,
        }
    }
}

impl BundleConstraints {
    pub fn venue_allowed(&self, venue: &str) -> bool {
        match &self.allowed_venues {
            Some(venues) => venues.iter().any(|v| v.eq_ignore_ascii_case(venue)),
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuccessModelConfig {
    pub base_probability: f64,
    pub learning_rate: f64,
    pub learning_error_threshold: f64,
    pub base_confidence: f64,
    pub recommendation_threshold: f64,
    pub default_average_tip_sol: f64,
    pub target_block_time_ms: u64,
    pub history_window: usize,
    pub size_penalty_free_txs: usize,
    pub size_penalty_per_tx: f64,
    pub congestion_penalty: f64,
}

impl Default for SuccessModelConfig {
    fn default() -> Self {
        Self {
            base_probability: BASE_SUCCESS_PROBABILITY,
            learning_rate: DEFAULT_LEARNING_RATE,
            learning_error_threshold: LEARNING_ERROR_THRESHOLD,
            base_confidence: BASE_PREDICTION_CONFIDENCE,
            recommendation_threshold: RECOMMENDATION_THRESHOLD,
            default_average_tip_sol: DEFAULT_AVERAGE_TIP_SOL,
            target_block_time_ms: 400,
            history_window: HISTORY_WINDOW,
            size_penalty_free_txs: 5,
            size_penalty_per_tx: 0.05,
            congestion_penalty: 0.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub network_refresh_secs: u64,
    pub history_cleanup_secs: u64,
    pub history_retention_secs: i64,
    pub min_success_probability: f64,
    pub min_expected_value_sol: Decimal,
    pub max_consecutive_errors: u32,
    pub circuit_breaker_cooldown_secs: u64,
    pub enable_persistence: bool,
    pub output_dir: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            network_refresh_secs: NETWORK_REFRESH_SECS,
            history_cleanup_secs: HISTORY_CLEANUP_SECS,
            history_retention_secs: HISTORY_RETENTION_SECS,
            min_success_probability: DEFAULT_MIN_SUCCESS_PROBABILITY,
            min_expected_value_sol: DEFAULT_MIN_EXPECTED_VALUE_SOL,
            max_consecutive_errors: 5,
            circuit_breaker_cooldown_secs: 300, // 5 minutes
            enable_persistence: true,
            output_dir: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub gas: GasConfig,
    pub factors: FactorConfig,
    pub monte_carlo: MonteCarloConfig,
    pub constraints: BundleConstraints,
    pub success: SuccessModelConfig,
    pub engine: EngineSettings,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_decimal(key: &str) -> Option<Decimal> {
    env::var(key).ok().and_then(|s| Decimal::from_str(s.trim()).ok())
}

impl Config {
    /// Opportunity freshness applies to both factor estimation and composition.
    pub fn with_opportunity_ttl(mut self, secs: u64) -> Self {
        self.factors.opportunity_ttl_secs = secs;
        self.constraints.opportunity_ttl_secs = secs;
        self
    }

    pub fn load() -> Self {
        let mut config = Self::default();

        config.constraints.max_bundle_size = env_parse("BUNDLE_MAX_SIZE")
            .unwrap_or(DEFAULT_MAX_BUNDLE_SIZE)
            .clamp(1, MAX_BUNDLE_SIZE_LIMIT);
        config.constraints.min_profit_threshold = env_decimal("BUNDLE_MIN_PROFIT_SOL")
            .unwrap_or(DEFAULT_MIN_PROFIT_SOL)
            .max(dec!(0));
        config.constraints.max_risk_score = env_parse("BUNDLE_MAX_RISK_SCORE")
            .unwrap_or(DEFAULT_MAX_RISK_SCORE)
            .clamp(0.0, 10.0);
        config.constraints.max_gas_to_profit_ratio = env_parse("BUNDLE_MAX_GAS_RATIO")
            .unwrap_or(DEFAULT_MAX_GAS_TO_PROFIT_RATIO)
            .clamp(0.01, 1.0);
        config.constraints.allowed_venues = env::var("BUNDLE_ALLOWED_VENUES").ok().map(|s| {
            s.split(',')
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect()
        });

        config.gas.max_priority_fee_sol = env_parse("BUNDLE_MAX_PRIORITY_FEE_SOL")
            .unwrap_or(MAX_PRIORITY_FEE_SOL)
            .max(MIN_PRIORITY_FEE_SOL);
        config.gas.compute_unit_price_micro_lamports = env_parse("BUNDLE_CU_PRICE_MICRO_LAMPORTS")
            .unwrap_or(DEFAULT_CU_PRICE_MICRO_LAMPORTS);

        config.monte_carlo.samples = env_parse("BUNDLE_MC_SAMPLES")
            .unwrap_or(DEFAULT_MONTE_CARLO_SAMPLES)
            .clamp(100, 1_000_000);
        config.monte_carlo.confidence_level = env_parse("BUNDLE_CONFIDENCE_LEVEL")
            .unwrap_or(DEFAULT_CONFIDENCE_LEVEL)
            .clamp(0.5, 0.999);
        config.monte_carlo.seed = env_parse("BUNDLE_MC_SEED");

        config.success.learning_rate = env_parse("BUNDLE_LEARNING_RATE")
            .unwrap_or(DEFAULT_LEARNING_RATE)
            .clamp(0.0, 1.0);

        config.engine.network_refresh_secs = env_parse("BUNDLE_NETWORK_REFRESH_SECS")
            .unwrap_or(NETWORK_REFRESH_SECS)
            .max(1);
        config.engine.min_success_probability = env_parse("BUNDLE_MIN_SUCCESS_PROBABILITY")
            .unwrap_or(DEFAULT_MIN_SUCCESS_PROBABILITY)
            .clamp(0.0, 1.0);
        config.engine.min_expected_value_sol = env_decimal("BUNDLE_MIN_EXPECTED_VALUE_SOL")
            .unwrap_or(DEFAULT_MIN_EXPECTED_VALUE_SOL);
        config.engine.enable_persistence = env::var("BUNDLE_ENABLE_PERSISTENCE")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        config.engine.output_dir = env::var("BUNDLE_OUTPUT_DIR")
            .unwrap_or_else(|_| "output".to_string());

        let ttl = env_parse("BUNDLE_OPPORTUNITY_TTL_SECS")
            .unwrap_or(OPPORTUNITY_TTL_SECS)
            .clamp(1, 3_600);
        config.with_opportunity_ttl(ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_within_bounds() {
        let config = Config::default();
        assert_eq!(config.constraints.max_bundle_size, DEFAULT_MAX_BUNDLE_SIZE);
        assert!(config.gas.min_priority_fee_sol < config.gas.max_priority_fee_sol);
        assert!(config.monte_carlo.confidence_level > 0.5 && config.monte_carlo.confidence_level < 1.0);
        assert!(config.factors.max_competition_probability <= 1.0);
    }

    #[test]
    fn venue_filter_is_case_insensitive() {
        let constraints = BundleConstraints {
            allowed_venues: Some(vec!["raydium".to_string()]),
            ..Default::default()
        };
        assert!(constraints.venue_allowed("Raydium"));
        assert!(!constraints.venue_allowed("orca"));
        assert!(BundleConstraints::default().venue_allowed("anything"));
    }

    #[test]
    fn opportunity_ttl_is_shared() {
        let config = Config::default();
        assert_eq!(config.factors.opportunity_ttl_secs, config.constraints.opportunity_ttl_secs);

        let config = config.with_opportunity_ttl(45);
        assert_eq!(config.factors.opportunity_ttl_secs, 45);
        assert_eq!(config.constraints.opportunity_ttl_secs, 45);
    }

    #[test]
    fn loaded_config_keeps_ttl_in_sync() {
        let config = Config::load();
        assert_eq!(config.factors.opportunity_ttl_secs, config.constraints.opportunity_ttl_secs);
        assert!((1..=3_600).contains(&config.factors.opportunity_ttl_secs));
    }
}
