//! Hour-of-day and day-of-week inclusion adjustments (UTC)

/// Busy overlap hours see more competing bundles; the quiet window sees fewer.
pub const HOUR_ADJUSTMENTS: [f64; 24] = [
    0.02, 0.03, 0.05, 0.05, 0.05, 0.05, 0.05, 0.03, // 00-07
    0.02, 0.0, 0.0, 0.0, 0.0, -0.05, -0.05, -0.06, // 08-15
    -0.06, -0.06, -0.05, -0.05, -0.05, 0.0, 0.0, 0.01, // 16-23
];

/// Monday first.
pub const DAY_ADJUSTMENTS: [f64; 7] = [0.0, 0.0, 0.0, 0.0, -0.02, 0.03, 0.03];

pub fn hour_adjustment(hour: u32) -> f64 {
    HOUR_ADJUSTMENTS.get(hour as usize).copied().unwrap_or(0.0)
}

pub fn day_adjustment(days_from_monday: u32) -> f64 {
    DAY_ADJUSTMENTS.get(days_from_monday as usize).copied().unwrap_or(0.0)
}
