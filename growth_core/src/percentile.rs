//! Z-score to percentile conversion.
//!
//! Percentiles are only reported for z-scores within ±3, the interval the
//! WHO standard restricts them to (0.135th to 99.865th percentile).

use std::f64::consts::PI;

const P: f64 = 0.2316419;
const B1: f64 = 0.31938;
const B2: f64 = -0.356563782;
const B3: f64 = 1.781477937;
const B4: f64 = -1.821255978;
const B5: f64 = 1.330274429;

/// Standard normal CDF at `|z|` by the Zelen & Severo polynomial
fn upper_cdf(abs_z: f64) -> f64 {
    let t = 1.0 / (1.0 + P * abs_z);
    let density = 1.0 / (2.0 * PI).sqrt() * (-abs_z.powf(2.0) / 2.0).exp();

    1.0 - density
        * (B1 * t + B2 * t.powf(2.0) + B3 * t.powf(3.0) + B4 * t.powf(4.0) + B5 * t.powf(5.0))
}

/// Percentile in `[0, 100]` for `zscore`, or `None` outside ±3.
pub fn zscore_to_percentile(zscore: f64) -> Option<f64> {
    if zscore.is_nan() || zscore.abs() > 3.0 {
        return None;
    }

    let p1 = upper_cdf(zscore.abs());
    let percentile = if zscore > 0.0 {
        p1 * 100.0
    } else {
        100.0 - p1 * 100.0
    };

    Some(percentile).filter(|p| (0.0..=100.0).contains(p))
}
