//! Measurement normalization and input bounds.
//!
//! Bounds follow WHO's anthro computation: values outside them make the
//! dependent indicators unavailable rather than raising an error.

use crate::{Error, MeasurementPosition, Result};
use std::ops::RangeInclusive;

/// Accepted weight, in kg
pub const WEIGHT_RANGE_KG: RangeInclusive<f64> = 0.9..=58.0;
/// Accepted length or height, in cm
pub const LENGTH_OR_HEIGHT_RANGE_CM: RangeInclusive<f64> = 38.0..=150.0;
/// Accepted head circumference, in cm
pub const HEAD_CIRCUMFERENCE_RANGE_CM: RangeInclusive<f64> = 25.0..=64.0;
/// Ages covered by the age-based indicators, in days
pub const AGE_RANGE_DAYS: RangeInclusive<i64> = 0..=1856;

/// Difference between recumbent length and standing height, in cm
pub const HEIGHT_CORRECTION_CM: f64 = 0.7;
/// From this age on children are expected to be measured standing
pub const STANDING_FROM_DAYS: i64 = 731;

/// Reject `NaN` and infinities; they are malformed input, not out-of-range values.
pub fn require_finite(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidInput(format!(
            "measurement must be a finite number, got {}",
            value
        )))
    }
}

/// Parse a measurement typed by a caller
pub fn parse_measurement(value: &str) -> Result<f64> {
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|e| Error::InvalidInput(format!("invalid number {:?}: {}", value, e)))?;
    require_finite(parsed)
}

pub fn weight_in_range(weight_kg: f64) -> bool {
    WEIGHT_RANGE_KG.contains(&weight_kg)
}

pub fn age_in_range(age_in_days: i64) -> bool {
    AGE_RANGE_DAYS.contains(&age_in_days)
}

/// Length or height converted to the position expected at the child's age
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedLengthOrHeight {
    length_or_height: Option<f64>,
    measured: MeasurementPosition,
}

impl NormalizedLengthOrHeight {
    /// Validate and correct a raw measurement.
    ///
    /// Children of 731 days or more measured lying down lose 0.7 cm and are
    /// reported standing; younger children measured standing gain 0.7 cm and
    /// are reported recumbent. The position is corrected even when the value
    /// itself is out of range. Negative ages are never corrected.
    ///
    /// Must be applied to raw measurements only: correcting twice is not detected.
    pub fn new(age_in_days: i64, length_or_height_cm: f64, measured: MeasurementPosition) -> Self {
        let value = Some(length_or_height_cm).filter(|v| LENGTH_OR_HEIGHT_RANGE_CM.contains(v));

        match measured {
            MeasurementPosition::Recumbent if age_in_days >= STANDING_FROM_DAYS => Self {
                length_or_height: value.map(|v| v - HEIGHT_CORRECTION_CM),
                measured: MeasurementPosition::Standing,
            },
            MeasurementPosition::Standing
                if (0..STANDING_FROM_DAYS).contains(&age_in_days) =>
            {
                Self {
                    length_or_height: value.map(|v| v + HEIGHT_CORRECTION_CM),
                    measured: MeasurementPosition::Recumbent,
                }
            }
            _ => Self {
                length_or_height: value,
                measured,
            },
        }
    }

    /// Corrected value; `None` when the raw value was out of range
    pub fn length_or_height(&self) -> Option<f64> {
        self.length_or_height
    }

    pub fn measured(&self) -> MeasurementPosition {
        self.measured
    }
}

/// Body mass index in kg/m², or `None` when weight or height is out of range.
pub fn body_mass_index(height_cm: Option<f64>, weight_kg: f64) -> Option<f64> {
    let height_cm = height_cm.filter(|h| LENGTH_OR_HEIGHT_RANGE_CM.contains(h))?;
    if !weight_in_range(weight_kg) {
        return None;
    }
    Some(weight_kg / (height_cm / 100.0).powf(2.0))
}
