//! Bundle Engine - Demo Entry Point
//!
//! Feeds synthetic opportunities through the engine against simulated market
//! and network conditions, rotating through every composition strategy.

use anyhow::Result;
use bundle_engine::*;
use bundle_engine::market::SimulatedMarketData;
use bundle_engine::network::SimulatedNetwork;
use bundle_engine::storage::{AuditSink, JsonlAuditStore, NullAuditSink};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{error, info};
use uuid::Uuid;

const VENUES: [&str; 6] = ["raydium", "orca", "whirlpool", "phoenix", "meteora", "openbook"];
const TOKENS: [&str; 6] = ["SOL", "USDC", "JUP", "BONK", "WIF", "USDT"];

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::load();

    // Initialize logging
    let _logging_guard = utils::setup_logging(&config.engine.output_dir)?;
    utils::setup_output_directories(&config.engine.output_dir)?;

    info!("📦 Bundle Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Max Bundle Size: {}", config.constraints.max_bundle_size);
    info!("   Min Profit: {} SOL", config.constraints.min_profit_threshold);
    info!("   Max Risk Score: {}", config.constraints.max_risk_score);
    info!("   Monte Carlo Samples: {}", config.monte_carlo.samples);
    info!("   Min Success Probability: {}", config.engine.min_success_probability);
    info!("   Min Expected Value: {} SOL", config.engine.min_expected_value_sol);
    info!("   Persistence: {}", config.engine.enable_persistence);

    let audit: Arc<dyn AuditSink> = if config.engine.enable_persistence {
        Arc::new(JsonlAuditStore::new(&config.engine.output_dir))
    } else {
        Arc::new(NullAuditSink)
    };

    let constraints = config.constraints.clone();
    let engine = Arc::new(BundleEngine::new(
        config,
        Arc::new(SimulatedMarketData::default()),
        Arc::new(SimulatedNetwork::default()),
        audit,
        EventSink::default(),
    ));

    if let Err(e) = engine.refresh_network().await {
        error!("Initial network refresh failed, using defaults: {}", e);
    }
    let background = engine.spawn_background_tasks();

    // Setup shutdown handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("\n📛 Received shutdown signal (Ctrl+C)...");
            let _ = shutdown_tx.send(());
        }
    });

    info!("\n🚀 Starting composition loop...\n");

    let start_time = Instant::now();
    let mut interval = time::interval(Duration::from_secs(2));
    let mut cycle: usize = 0;
    let mut decisions: u64 = 0;
    let mut submitted: u64 = 0;
    let mut submitted_value = Decimal::ZERO;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let strategy = CompositionStrategy::ALL[cycle % CompositionStrategy::ALL.len()];
                cycle += 1;

                let batch = synthetic_batch(8);
                if let Some(decision) = engine.evaluate_and_compose(&batch, &constraints, strategy).await {
                    decisions += 1;
                    if decision.submit {
                        submitted += 1;
                        submitted_value += decision.expected_value;
                    }
                    utils::print_bundle_decision(&decision);

                    // Simulated outcome tracker
                    let landed = rand::rng().random::<f64>() < decision.success.success_probability;
                    engine.record_outcome(&ActualOutcome {
                        bundle_id: decision.bundle.id.clone(),
                        actual_success: landed,
                        actual_latency_ms: rand::rng().random_range(300..1_500),
                        compute_units_consumed: landed.then(|| {
                            rand::rng().random_range(120_000..240_000) * decision.bundle.size() as u64
                        }),
                    }).await;
                }

                if cycle % 30 == 0 {
                    let stats = engine.composer().stats().await;
                    utils::print_composition_stats(
                        start_time,
                        &stats,
                        decisions,
                        submitted,
                        submitted_value,
                        engine.success_estimator().average_latency_ms(),
                    );
                }
            }
            _ = &mut shutdown_rx => {
                info!("Shutdown signal received, exiting main loop...");
                break;
            }
        }
    }

    for handle in background {
        handle.abort();
    }

    let stats = engine.composer().stats().await;
    utils::print_composition_stats(
        start_time,
        &stats,
        decisions,
        submitted,
        submitted_value,
        engine.success_estimator().average_latency_ms(),
    );
    info!("Final model weights: {:?}", engine.success_estimator().weights());

    Ok(())
}

fn synthetic_batch(count: usize) -> Vec<Opportunity> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| {
            let kind = OpportunityKind::ALL[rng.random_range(0..OpportunityKind::ALL.len())];
            let primary = VENUES[rng.random_range(0..VENUES.len())];
            let secondary = VENUES[rng.random_range(0..VENUES.len())];
            let token = TOKENS[rng.random_range(0..TOKENS.len())];

            let volume = Decimal::from(rng.random_range(1..40));
            let buy_price = dec!(100);
            let spread_bps = Decimal::from(rng.random_range(5..120));
            let sell_price = buy_price * (Decimal::ONE + spread_bps / dec!(10000));
            let profit = (sell_price - buy_price) / buy_price * volume;

            Opportunity {
                id: Uuid::new_v4().to_string(),
                kind,
                primary_venue: primary.to_string(),
                secondary_venue: (primary != secondary).then(|| secondary.to_string()),
                tokens: vec![token.to_string(), "USDC".to_string()],
                volume,
                buy_price,
                sell_price,
                declared_profit: profit,
                declared_gas_cost: dec!(0.0005) + Decimal::from(rng.random_range(0..20)) / dec!(10000),
                declared_risk_score: rng.random_range(1.0..8.0),
                detected_at: Utc::now(),
            }
        })
        .collect()
}
