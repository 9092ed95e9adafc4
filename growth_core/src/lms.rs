//! Box-Cox LMS z-scores with the WHO restriction beyond ±3 SD.
//!
//! Beyond three standard deviations the fitted distribution is no longer
//! trusted, so measurements there are scored linearly using the distance
//! between the 2 SD and 3 SD cutoffs on the measurement scale.

use serde::{Deserialize, Serialize};

/// Box-Cox parameters: power (L), median (M) and coefficient of variation (S)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lms {
    pub l: f64,
    pub m: f64,
    pub s: f64,
}

impl Lms {
    pub fn new(l: f64, m: f64, s: f64) -> Self {
        Self { l, m, s }
    }

    /// Unrestricted z-score of measurement `x`
    pub fn zscore(&self, x: f64) -> f64 {
        if self.l == 0.0 {
            return (x / self.m).ln() / self.s;
        }
        ((x / self.m).powf(self.l) - 1.0) / (self.l * self.s)
    }

    /// Measurement that sits exactly at `desired_zscore`
    pub fn cutoff(&self, desired_zscore: f64) -> f64 {
        if self.l == 0.0 {
            return self.m * (self.s * desired_zscore).exp();
        }
        self.m * (1.0 + self.l * self.s * desired_zscore).powf(1.0 / self.l)
    }

    /// Z-score of `x`, extrapolated linearly outside ±3.
    ///
    /// The unrestricted score only selects the branch. Returns `None` when
    /// the result is not a finite number.
    pub fn restricted_zscore(&self, x: f64) -> Option<f64> {
        let z = self.zscore(x);

        let restricted = if z > 3.0 {
            let sd3 = self.cutoff(3.0);
            let sd23 = sd3 - self.cutoff(2.0);
            3.0 + (x - sd3) / sd23
        } else if z < -3.0 {
            let sd3 = self.cutoff(-3.0);
            let sd23 = self.cutoff(-2.0) - sd3;
            -3.0 + (x - sd3) / sd23
        } else {
            z
        };

        Some(restricted).filter(|z| z.is_finite())
    }
}
