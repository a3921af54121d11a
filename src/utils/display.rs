//! Display and printing utilities

use std::collections::HashMap;
use std::time::Instant;
use rust_decimal::Decimal;
use tracing::{info, warn};
use crate::{
    bundle::CompositionStats,
    pipeline::BundleDecision,
    profit::total_risk_adjusted,
    types::CompositionStrategy,
};

pub fn print_bundle_decision(decision: &BundleDecision) {
    let bundle = &decision.bundle;
    let verdict = if decision.submit { "SUBMIT" } else { "HOLD" };

    warn!("\n📦 BUNDLE {} [{}]", bundle.id, verdict);
    warn!("📋 Strategy: {} ({} of {} opportunities, {}ms)",
        bundle.composition.strategy,
        bundle.size(),
        bundle.composition.opportunities_considered,
        bundle.composition.composition_time_ms
    );
    for (i, tx) in bundle.transactions.iter().enumerate() {
        warn!("   {}. {} {} on {} profit={} SOL risk={:.1}",
            i + 1, tx.kind, tx.id, tx.primary_venue, tx.declared_profit, tx.declared_risk_score
        );
    }

    warn!("💰 Metrics:");
    warn!("   Gross Profit: {:.6} SOL", bundle.metrics.gross_profit);
    warn!("   Gas Cost:     {:.6} SOL", bundle.metrics.total_gas_cost);
    warn!("   Net Profit:   {:.6} SOL", bundle.metrics.net_profit);
    warn!("   Tip:          {:.6} SOL", bundle.tip);
    warn!("   Gas Efficiency: {:.1}x", bundle.metrics.gas_efficiency);
    warn!("   Risk: {:.2}/10, Confidence: {:.2}", bundle.metrics.overall_risk, bundle.metrics.confidence_level);
    warn!("   Risk-adjusted (evaluated): {:.6} SOL", total_risk_adjusted(&decision.profits));

    warn!("🎯 Inclusion:");
    warn!("   P(success): {:.1}% (confidence {:.2})",
        decision.success.success_probability * 100.0,
        decision.success.confidence
    );
    warn!("   Expected Value: {:.6} SOL", decision.expected_value);
    for recommendation in &decision.success.recommendations {
        warn!("   → {}", recommendation);
    }

    if !bundle.validation.is_valid {
        warn!("⚠️  Validation issues:");
        for issue in &bundle.validation.issues {
            warn!("   - {}", issue);
        }
    }
    warn!("");
}

pub fn print_composition_stats(
    start_time: Instant,
    stats: &HashMap<CompositionStrategy, CompositionStats>,
    decisions: u64,
    submitted: u64,
    submitted_value: Decimal,
    average_latency_ms: Option<f64>,
) {
    let runtime = start_time.elapsed().as_secs() / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("   Decisions: {}", decisions);
    info!("   Recommended for submission: {} ({:.1}%)",
        submitted,
        if decisions > 0 {
            (submitted as f64 / decisions as f64) * 100.0
        } else {
            0.0
        }
    );
    info!("   Expected value submitted: {:.6} SOL", submitted_value);
    match average_latency_ms {
        Some(latency) => info!("   Average landing latency: {:.0}ms", latency),
        None => info!("   Average landing latency: n/a"),
    }

    info!("   🧩 COMPOSITION:");
    for strategy in CompositionStrategy::ALL {
        if let Some(s) = stats.get(&strategy) {
            info!("     {:<12} attempts={} composed={} invalid={} empty={} avg={:.1}ms",
                strategy.to_string(), s.attempts, s.composed, s.invalid, s.empty, s.mean_time_ms()
            );
        }
    }
    info!("");
}
