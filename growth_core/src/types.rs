//! Core domain types for growth indicator computation.
//!
//! This module defines the fundamental types used throughout the system:
//! - Sex and measurement position
//! - The measurement set supplied by a caller
//! - Per-indicator z-score/percentile pairs
//! - The immutable visit statistics aggregate

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Age reported when it cannot be derived from the visit and birth dates.
pub const NO_AGE_IN_DAYS: i64 = -1;

/// Bucket used for every z-score below -3 when bucketing.
pub const BELOW_LOWEST_ZSCORE: f64 = -4.0;

// ============================================================================
// Sex and Position
// ============================================================================

/// Sex of the child, joined against the reference tables by its code
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Integer code used in the `sex` column of the WHO tables
    pub fn code(self) -> u8 {
        match self {
            Sex::Male => 1,
            Sex::Female => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Sex::Male),
            2 => Some(Sex::Female),
            _ => None,
        }
    }
}

impl FromStr for Sex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "1" => Ok(Sex::Male),
            "female" | "f" | "2" => Ok(Sex::Female),
            other => Err(Error::InvalidInput(format!("unknown sex: {:?}", other))),
        }
    }
}

/// Position in which length or height was measured
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementPosition {
    /// Upright; yields a height
    Standing,
    /// Lying down; yields a length
    Recumbent,
}

impl FromStr for MeasurementPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "standing" | "height" | "h" => Ok(MeasurementPosition::Standing),
            "recumbent" | "length" | "l" => Ok(MeasurementPosition::Recumbent),
            other => Err(Error::InvalidInput(format!(
                "unknown measurement position: {:?}",
                other
            ))),
        }
    }
}

// ============================================================================
// Indicators
// ============================================================================

/// The five WHO growth indicators
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    WeightForLengthOrHeight,
    WeightForAge,
    LengthOrHeightForAge,
    BodyMassIndexForAge,
    HeadCircumferenceForAge,
}

impl Indicator {
    /// All indicators, in reporting order
    pub const ALL: [Indicator; 5] = [
        Indicator::WeightForLengthOrHeight,
        Indicator::WeightForAge,
        Indicator::LengthOrHeightForAge,
        Indicator::BodyMassIndexForAge,
        Indicator::HeadCircumferenceForAge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Indicator::WeightForLengthOrHeight => "weight_for_length_or_height",
            Indicator::WeightForAge => "weight_for_age",
            Indicator::LengthOrHeightForAge => "length_or_height_for_age",
            Indicator::BodyMassIndexForAge => "body_mass_index_for_age",
            Indicator::HeadCircumferenceForAge => "head_circumference_for_age",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Input
// ============================================================================

/// A measurement set for one visit, as supplied by a caller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeasurementInput {
    pub sex: Sex,
    pub birth_date: Option<NaiveDate>,
    pub visit_date: Option<NaiveDate>,
    pub weight_kg: f64,
    pub length_or_height_cm: f64,
    pub head_circumference_cm: Option<f64>,
    pub measured: MeasurementPosition,
    pub has_oedema: bool,
}

impl MeasurementInput {
    /// Days between birth and visit; negative when the visit precedes birth.
    ///
    /// Returns `None` if either date is missing.
    pub fn age_in_days(&self) -> Option<i64> {
        match (self.visit_date, self.birth_date) {
            (Some(visit), Some(birth)) => Some((visit - birth).num_days()),
            _ => None,
        }
    }
}

// ============================================================================
// Z-score and Percentile
// ============================================================================

/// A z-score and its percentile; either may be absent.
///
/// The percentile is only ever present when the z-score lies within ±3.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZscoreAndPercentile {
    zscore: Option<f64>,
    percentile: Option<f64>,
}

impl ZscoreAndPercentile {
    pub fn new(zscore: Option<f64>, percentile: Option<f64>) -> Self {
        Self { zscore, percentile }
    }

    /// Pair whose percentile is derived from the z-score
    pub fn from_zscore(zscore: Option<f64>) -> Self {
        Self {
            zscore,
            percentile: zscore.and_then(crate::percentile::zscore_to_percentile),
        }
    }

    /// Pair for an indicator that could not be computed
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn zscore(&self) -> Option<f64> {
        self.zscore
    }

    pub fn percentile(&self) -> Option<f64> {
        self.percentile
    }

    pub fn zscore_is_absent(&self) -> bool {
        self.zscore.is_none()
    }

    pub fn percentile_is_absent(&self) -> bool {
        self.percentile.is_none()
    }

    /// A negative z-score with a percentile under 25 (or beyond -3 SD).
    pub fn is_alertworthy(&self) -> bool {
        match self.zscore {
            Some(z) if z < 0.0 => self.percentile.map_or(true, |p| p < 25.0),
            _ => false,
        }
    }
}

fn fmt_optional(value: Option<f64>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{}", v),
        None => f.write_str("NaN"),
    }
}

fn parse_optional(s: &str) -> Result<Option<f64>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("-1.#ind") {
        return Ok(None);
    }
    s.parse::<f64>()
        .map(|v| Some(v).filter(|v| v.is_finite()))
        .map_err(|e| Error::InvalidInput(format!("invalid number {:?}: {}", s, e)))
}

/// Storage form `"<zscore>:<percentile>"`, absent values as `NaN`
impl fmt::Display for ZscoreAndPercentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_optional(self.zscore, f)?;
        f.write_str(":")?;
        fmt_optional(self.percentile, f)
    }
}

impl FromStr for ZscoreAndPercentile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (zscore, percentile) = s.split_once(':').ok_or_else(|| {
            Error::InvalidInput(format!("expected <zscore>:<percentile>, got {:?}", s))
        })?;
        Ok(Self::new(parse_optional(zscore)?, parse_optional(percentile)?))
    }
}

/// Floor a z-score into a width-1 bucket, collapsing everything below -3.
pub fn bucket_zscore(zscore: f64) -> f64 {
    let bucket = zscore.floor();
    if bucket < -3.0 {
        BELOW_LOWEST_ZSCORE
    } else {
        bucket
    }
}

// ============================================================================
// Visit Statistics
// ============================================================================

/// Growth statistics computed for a single visit.
///
/// Built once by [`crate::indicators::calculate_scores`] and read-only
/// afterwards; recomputing means building a new value.
#[derive(Clone, Debug)]
pub struct VisitStatistics {
    generated_date: DateTime<Utc>,
    age_in_days: i64,
    body_mass_index: Option<f64>,
    weight_for_length_or_height: ZscoreAndPercentile,
    weight_for_age: ZscoreAndPercentile,
    length_or_height_for_age: ZscoreAndPercentile,
    body_mass_index_for_age: ZscoreAndPercentile,
    head_circumference_for_age: Option<ZscoreAndPercentile>,
}

/// Indicator values of a [`VisitStatistics`], in construction order
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct IndicatorScores {
    pub weight_for_length_or_height: ZscoreAndPercentile,
    pub weight_for_age: ZscoreAndPercentile,
    pub length_or_height_for_age: ZscoreAndPercentile,
    pub body_mass_index_for_age: ZscoreAndPercentile,
    pub head_circumference_for_age: Option<ZscoreAndPercentile>,
}

impl VisitStatistics {
    pub(crate) fn new(
        generated_date: DateTime<Utc>,
        age_in_days: i64,
        body_mass_index: Option<f64>,
        scores: IndicatorScores,
    ) -> Self {
        Self {
            generated_date,
            age_in_days,
            body_mass_index,
            weight_for_length_or_height: scores.weight_for_length_or_height,
            weight_for_age: scores.weight_for_age,
            length_or_height_for_age: scores.length_or_height_for_age,
            body_mass_index_for_age: scores.body_mass_index_for_age,
            head_circumference_for_age: scores.head_circumference_for_age,
        }
    }

    pub fn generated_date(&self) -> DateTime<Utc> {
        self.generated_date
    }

    pub fn age_in_days(&self) -> i64 {
        self.age_in_days
    }

    pub fn body_mass_index(&self) -> Option<f64> {
        self.body_mass_index
    }

    pub fn weight_for_length_or_height(&self) -> &ZscoreAndPercentile {
        &self.weight_for_length_or_height
    }

    pub fn weight_for_age(&self) -> &ZscoreAndPercentile {
        &self.weight_for_age
    }

    pub fn length_or_height_for_age(&self) -> &ZscoreAndPercentile {
        &self.length_or_height_for_age
    }

    pub fn body_mass_index_for_age(&self) -> &ZscoreAndPercentile {
        &self.body_mass_index_for_age
    }

    /// `None` when no head circumference was measured
    pub fn head_circumference_for_age(&self) -> Option<&ZscoreAndPercentile> {
        self.head_circumference_for_age.as_ref()
    }

    /// Look up an indicator by name; `None` only for an unmeasured head circumference
    pub fn get_zandp(&self, indicator: Indicator) -> Option<&ZscoreAndPercentile> {
        match indicator {
            Indicator::WeightForLengthOrHeight => Some(&self.weight_for_length_or_height),
            Indicator::WeightForAge => Some(&self.weight_for_age),
            Indicator::LengthOrHeightForAge => Some(&self.length_or_height_for_age),
            Indicator::BodyMassIndexForAge => Some(&self.body_mass_index_for_age),
            Indicator::HeadCircumferenceForAge => self.head_circumference_for_age.as_ref(),
        }
    }

    /// Present indicators with their values, in reporting order
    pub fn indicators(&self) -> impl Iterator<Item = (Indicator, &ZscoreAndPercentile)> + '_ {
        Indicator::ALL
            .into_iter()
            .filter_map(move |indicator| self.get_zandp(indicator).map(|z| (indicator, z)))
    }

    pub fn is_alertworthy(&self) -> bool {
        self.indicators().any(|(_, zandp)| zandp.is_alertworthy())
    }

    /// Lowest present z-score across all indicators, ignoring absent ones
    pub fn worst_zscore(&self) -> Option<f64> {
        self.indicators()
            .filter_map(|(_, zandp)| zandp.zscore())
            .reduce(f64::min)
    }

    /// Flat record using the wire attribute names
    pub fn to_record(&self) -> StatisticsRecord {
        let zscore = |i| self.get_zandp(i).and_then(ZscoreAndPercentile::zscore);
        let percentile = |i| self.get_zandp(i).and_then(ZscoreAndPercentile::percentile);

        StatisticsRecord {
            generated_date: self.generated_date.to_rfc3339(),
            age_in_days: self.age_in_days,
            body_mass_index: self.body_mass_index,
            weight_for_length_or_height_zscore: zscore(Indicator::WeightForLengthOrHeight),
            weight_for_length_or_height_percentile: percentile(
                Indicator::WeightForLengthOrHeight,
            ),
            weight_for_age_zscore: zscore(Indicator::WeightForAge),
            weight_for_age_percentile: percentile(Indicator::WeightForAge),
            length_or_height_for_age_zscore: zscore(Indicator::LengthOrHeightForAge),
            length_or_height_for_age_percentile: percentile(Indicator::LengthOrHeightForAge),
            body_mass_index_for_age_zscore: zscore(Indicator::BodyMassIndexForAge),
            body_mass_index_for_age_percentile: percentile(Indicator::BodyMassIndexForAge),
            head_circumference_for_age_zscore: zscore(Indicator::HeadCircumferenceForAge),
            head_circumference_for_age_percentile: percentile(
                Indicator::HeadCircumferenceForAge,
            ),
        }
    }
}

/// Wire form: the attributes of [`StatisticsRecord`], except that an
/// unmeasured head circumference leaves out its two attributes entirely.
impl Serialize for VisitStatistics {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("generated_date", &self.generated_date.to_rfc3339())?;
        map.serialize_entry("age_in_days", &self.age_in_days)?;
        map.serialize_entry("body_mass_index", &self.body_mass_index)?;
        for (indicator, zandp) in self.indicators() {
            map.serialize_entry(&format!("{}_zscore", indicator), &zandp.zscore())?;
            map.serialize_entry(&format!("{}_percentile", indicator), &zandp.percentile())?;
        }
        map.end()
    }
}

/// One row of batch statistics output; every column is always present
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub generated_date: String,
    pub age_in_days: i64,
    pub body_mass_index: Option<f64>,
    pub weight_for_length_or_height_zscore: Option<f64>,
    pub weight_for_length_or_height_percentile: Option<f64>,
    pub weight_for_age_zscore: Option<f64>,
    pub weight_for_age_percentile: Option<f64>,
    pub length_or_height_for_age_zscore: Option<f64>,
    pub length_or_height_for_age_percentile: Option<f64>,
    pub body_mass_index_for_age_zscore: Option<f64>,
    pub body_mass_index_for_age_percentile: Option<f64>,
    pub head_circumference_for_age_zscore: Option<f64>,
    pub head_circumference_for_age_percentile: Option<f64>,
}
