//! Slippage cost estimation

use crate::{
    config::FactorConfig,
    types::{Opportunity, SlippageCost},
    utils::to_f64,
};

/// Expected slippage for one leg, in SOL.
pub fn leg_slippage(volume: f64, trade_value: f64, liquidity: f64, volatility: f64, config: &FactorConfig) -> f64 {
    if liquidity <= 0.0 || volume <= 0.0 {
        return 0.0;
    }
    let impact = (trade_value / liquidity).min(config.max_price_impact);
    let rate = impact * (config.base_slippage_bps / 10_000.0) * (1.0 + 2.0 * volatility.clamp(0.0, 1.0));
    rate * volume
}

/// Both legs of the trade; single-venue trades route both legs through the primary venue.
pub fn estimate_slippage(
    opportunity: &Opportunity,
    primary_liquidity: f64,
    secondary_liquidity: Option<f64>,
    volatility: f64,
    config: &FactorConfig,
) -> SlippageCost {
    let volume = to_f64(opportunity.volume);
    let value = opportunity.trade_value_f64();

    let primary = leg_slippage(volume, value, primary_liquidity, volatility, config);
    let secondary = leg_slippage(
        volume,
        value,
        secondary_liquidity.unwrap_or(primary_liquidity),
        volatility,
        config,
    );
    let total = primary + secondary;

    SlippageCost {
        primary,
        secondary,
        total,
        variance: (total * 0.25).powi(2),
    }
}
