//! End-to-end decision scenarios

use std::sync::Arc;

use bundle_engine::bundle::{BundleComposer, filter_eligible, strategies, validate_addition};
use bundle_engine::config::{BundleConstraints, FactorConfig, GasConfig, MonteCarloConfig, SuccessModelConfig};
use bundle_engine::factors::{ExecutionRiskInputs, ExecutionRiskWeights, FactorEstimator, estimate_execution_risk};
use bundle_engine::gas::GasFeeModel;
use bundle_engine::market::{HistoricalStats, MarketDataCache, StaticMarketData};
use bundle_engine::montecarlo::MonteCarloEngine;
use bundle_engine::profit::{ProfitCalculator, ProfitOptions};
use bundle_engine::storage::MemoryAuditSink;
use bundle_engine::success::{SuccessRateEstimator, tip_tier};
use bundle_engine::*;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_test::assert_ok;

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 14, 15, 0, 0).single().unwrap_or_else(Utc::now)
}

fn opportunity(id: &str, profit: Decimal, now: DateTime<Utc>) -> Opportunity {
    Opportunity {
        id: id.to_string(),
        kind: OpportunityKind::Arbitrage,
        primary_venue: "raydium".to_string(),
        secondary_venue: Some("orca".to_string()),
        tokens: vec!["SOL".to_string(), "USDC".to_string()],
        volume: dec!(10),
        buy_price: dec!(100),
        sell_price: dec!(101),
        declared_profit: profit,
        declared_gas_cost: dec!(0.001),
        declared_risk_score: 3.0,
        detected_at: now,
    }
}

fn seeded_monte_carlo() -> MonteCarloEngine {
    MonteCarloEngine::new(MonteCarloConfig {
        seed: Some(7),
        ..Default::default()
    })
}

fn calculator(audit: Arc<MemoryAuditSink>) -> ProfitCalculator {
    let factor_config = FactorConfig::default();
    let data = StaticMarketData::default()
        .with_liquidity("raydium", 1e9)
        .with_liquidity("orca", 1e9)
        .with_reliability("raydium", 0.99)
        .with_reliability("orca", 0.99)
        .with_prices("SOL", vec![100.0; 30]);
    let cache = Arc::new(MarketDataCache::new(Arc::new(data), &factor_config));
    let factors = Arc::new(FactorEstimator::new(factor_config, cache, Arc::new(HistoricalStats::new())));
    ProfitCalculator::new(
        Arc::new(GasFeeModel::new(GasConfig::default())),
        factors,
        seeded_monte_carlo(),
        audit,
        EventSink::default(),
    )
    .with_persistence(false)
}

#[test]
fn wide_spread_without_costs_is_almost_surely_profitable() {
    let analysis = seeded_monte_carlo().simulate(1.0, &CostFactors::default(), &RiskFactors::default(), 10_000);

    assert!(analysis.median > 0.0);
    assert!(analysis.lower_bound > 0.0);
    assert!(analysis.profitability_probability > 0.9);
    assert!(analysis.max <= 1.0 + 1e-9);
}

#[tokio::test]
async fn two_percent_spread_on_fifty_units_yields_one_sol_base() {
    let now = Utc::now();
    let mut opp = opportunity("wide", dec!(1.0), now);
    opp.buy_price = dec!(100);
    opp.sell_price = dec!(102);
    opp.volume = dec!(50);

    let calc = calculator(Arc::new(MemoryAuditSink::new()));
    let options = ProfitOptions {
        now: Some(now),
        samples: Some(2_000),
        ..Default::default()
    };
    let result = assert_ok!(calc.calculate(&opp, &options).await);

    assert_eq!(result.base_profit, dec!(1.0));
    assert!(result.net_profit.expected > Decimal::ZERO);
    assert!(result.probabilities.profitability > 0.9);
    assert!(result.confidence_intervals.lower <= result.confidence_intervals.median);
    assert!(result.confidence_intervals.median <= result.confidence_intervals.upper);
}

#[test]
fn greedy_takes_the_three_most_profitable() {
    let now = at();
    let profits = [dec!(0.05), dec!(0.30), dec!(0.12), dec!(0.80), dec!(0.02), dec!(0.45)];
    let opps: Vec<Opportunity> = profits
        .iter()
        .enumerate()
        .map(|(i, p)| opportunity(&format!("opp-{}", i), *p, now))
        .collect();
    let constraints = BundleConstraints {
        max_bundle_size: 3,
        ..Default::default()
    };

    let empty = BundleCandidate::default();
    assert!(opps.iter().all(|o| validate_addition(&empty, o, &constraints).is_ok()));

    let bundle = strategies::greedy(&opps, &constraints);
    let ids: Vec<&str> = bundle.transactions.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["opp-3", "opp-5", "opp-1"]);
}

#[tokio::test]
async fn greedy_composition_is_deterministic() {
    let now = at();
    let opps: Vec<Opportunity> = (0..8)
        .map(|i| opportunity(&format!("opp-{}", i), dec!(0.02) * Decimal::from(i + 1), now))
        .collect();
    let constraints = BundleConstraints::default();
    let composer = BundleComposer::new(Arc::new(GasFeeModel::new(GasConfig::default())), EventSink::default());

    let first = composer
        .compose_at(&opps, &constraints, CompositionStrategy::Greedy, now)
        .await
        .expect("first bundle");
    let second = composer
        .compose_at(&opps, &constraints, CompositionStrategy::Greedy, now)
        .await
        .expect("second bundle");

    let order = |b: &ComposedBundle| b.transactions.iter().map(|o| o.id.clone()).collect::<Vec<_>>();
    assert_eq!(order(&first), order(&second));
    assert_eq!(first.metrics.net_profit, second.metrics.net_profit);
    assert_eq!(first.metrics.total_gas_cost, second.metrics.total_gas_cost);
    assert_eq!(first.metrics.overall_risk, second.metrics.overall_risk);
    assert_eq!(first.tip, second.tip);
}

#[test]
fn gas_equal_to_profit_never_enters_a_bundle() {
    let now = at();
    let mut edge = opportunity("edge", dec!(0.04), now);
    edge.declared_gas_cost = dec!(0.04);
    let mut under = opportunity("under", dec!(0.04), now);
    under.declared_gas_cost = dec!(0.0399);

    let eligible = filter_eligible(&[edge, under], &BundleConstraints::default(), now);
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].id, "under");
}

#[test]
fn triple_tip_adds_at_least_point_four() {
    let estimator = SuccessRateEstimator::new(SuccessModelConfig::default());
    let average = estimator.average_tip();
    let network = NetworkContext {
        observed_at: at(),
        ..Default::default()
    };
    let profile = |id: &str, tip: f64| BundleProfile {
        bundle_id: id.to_string(),
        size: 3,
        tip,
        estimated_gas: 0.001,
        priority: PriorityLevel::Normal,
    };

    let baseline = estimator.estimate(&profile("baseline", average), &network);
    let boosted = estimator.estimate(&profile("boosted", average * 3.0), &network);

    assert!(boosted.factors.tip_contribution - baseline.factors.tip_contribution >= 0.4 - 1e-9);
    assert!(tip_tier(3.0) >= 0.4);
    assert!(boosted.success_probability >= baseline.success_probability);
}

#[test]
fn execution_risk_grows_with_trade_value() {
    let inputs = |trade_value: f64| ExecutionRiskInputs {
        network_congestion: 0.4,
        trade_value,
        liquidity: 100_000.0,
        volatility: 0.3,
        venue_reliability: 0.9,
        age_secs: 5.0,
        ttl_secs: 30.0,
    };
    let weights = ExecutionRiskWeights::default();

    let mut previous = 0.0;
    for value in [500.0, 2_000.0, 5_000.0, 15_000.0] {
        let risk = estimate_execution_risk(&inputs(value), &weights);
        assert!(risk >= previous, "risk dropped at trade value {}", value);
        previous = risk;
    }
    assert!(
        estimate_execution_risk(&inputs(15_000.0), &weights)
            > estimate_execution_risk(&inputs(500.0), &weights)
    );
}
