//! Mathematical utility functions

use rust_decimal::prelude::*;

/// Lossy conversion used at the boundary between money and statistics.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Non-finite inputs map to zero.
pub fn to_decimal(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(9))
        .unwrap_or(Decimal::ZERO)
}

pub fn lamports_to_sol(lamports: f64) -> f64 {
    lamports / crate::config::LAMPORTS_PER_SOL
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Nearest-rank percentile over an ascending slice; `q` in [0, 1].
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let q = q.clamp(0.0, 1.0);
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Share of `values` strictly below `x`, in [0, 1].
pub fn percentile_rank(values: &[f64], x: f64) -> f64 {
    if values.is_empty() {
        return 0.5;
    }
    values.iter().filter(|v| **v < x).count() as f64 / values.len() as f64
}

pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}
