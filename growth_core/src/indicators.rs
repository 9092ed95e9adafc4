//! Growth indicator computation for a single visit.
//!
//! Each indicator checks its own preconditions, looks up the matching
//! reference row and scores the measurement:
//!
//! | indicator                    | oedema gates | age 0..=1856 | value check            |
//! |------------------------------|--------------|--------------|------------------------|
//! | weight_for_age               | yes          | yes          | weight 0.9..=58 kg     |
//! | length_or_height_for_age     | no           | yes          | length/height ≥ 1 cm   |
//! | weight_for_length_or_height  | yes          | not negative | weight 0.9..=58 kg     |
//! | body_mass_index_for_age      | yes          | yes          | weight, height > 0     |
//! | head_circumference_for_age   | no           | yes          | head circ. 25..=64 cm  |
//!
//! A failed precondition or a missing reference row yields an absent
//! z-score and percentile, never an error.

use crate::measurement::{self, NormalizedLengthOrHeight};
use crate::reference::{Dataset, ReferenceSet};
use crate::types::IndicatorScores;
use crate::{
    MeasurementInput, MeasurementPosition, Sex, VisitStatistics, ZscoreAndPercentile,
    NO_AGE_IN_DAYS,
};
use chrono::{DateTime, Utc};

/// Compute every indicator for one visit
pub fn calculate_scores(input: &MeasurementInput, references: &ReferenceSet) -> VisitStatistics {
    calculate_scores_at(input, references, Utc::now())
}

/// Like [`calculate_scores`] with an explicit generation timestamp
pub fn calculate_scores_at(
    input: &MeasurementInput,
    references: &ReferenceSet,
    generated_date: DateTime<Utc>,
) -> VisitStatistics {
    let age_in_days = input.age_in_days().unwrap_or_else(|| {
        tracing::debug!("Visit or birth date missing, no age available");
        NO_AGE_IN_DAYS
    });
    let sex = input.sex;
    let weight = input.weight_kg;
    let loh = NormalizedLengthOrHeight::new(age_in_days, input.length_or_height_cm, input.measured);

    let body_mass_index = if input.has_oedema {
        None
    } else {
        measurement::body_mass_index(loh.length_or_height(), weight)
    };

    let scores = IndicatorScores {
        weight_for_length_or_height: weight_for_length_or_height(
            references,
            sex,
            age_in_days,
            &loh,
            weight,
            input.has_oedema,
        ),
        weight_for_age: weight_for_age(references, sex, age_in_days, weight, input.has_oedema),
        length_or_height_for_age: length_or_height_for_age(references, sex, age_in_days, &loh),
        body_mass_index_for_age: body_mass_index_for_age(
            references,
            sex,
            age_in_days,
            body_mass_index,
            weight,
            loh.length_or_height(),
            input.has_oedema,
        ),
        head_circumference_for_age: input
            .head_circumference_cm
            .map(|hc| head_circumference_for_age(references, sex, age_in_days, hc)),
    };

    tracing::debug!(
        "Computed statistics: age {} days, BMI {:?}",
        age_in_days,
        body_mass_index
    );

    VisitStatistics::new(generated_date, age_in_days, body_mass_index, scores)
}

/// Score `measure` against the row keyed by (`sex`, `key`) in `dataset`
fn score(
    references: &ReferenceSet,
    dataset: Dataset,
    sex: Sex,
    key: f64,
    measure: f64,
) -> ZscoreAndPercentile {
    match references.lookup(dataset, sex, key) {
        Some(lms) => ZscoreAndPercentile::from_zscore(lms.restricted_zscore(measure)),
        None => {
            tracing::debug!("No {:?} reference row for {:?} at {}", dataset, sex, key);
            ZscoreAndPercentile::absent()
        }
    }
}

fn skipped(indicator: &str, reason: &str) -> ZscoreAndPercentile {
    tracing::debug!("Skipping {}: {}", indicator, reason);
    ZscoreAndPercentile::absent()
}

pub fn weight_for_age(
    references: &ReferenceSet,
    sex: Sex,
    age_in_days: i64,
    weight_kg: f64,
    has_oedema: bool,
) -> ZscoreAndPercentile {
    if has_oedema {
        return skipped("weight_for_age", "oedema");
    }
    if !measurement::age_in_range(age_in_days) {
        return skipped("weight_for_age", "age out of range");
    }
    if !measurement::weight_in_range(weight_kg) {
        return skipped("weight_for_age", "weight out of range");
    }
    score(
        references,
        Dataset::WeightForAge,
        sex,
        age_in_days as f64,
        weight_kg,
    )
}

/// Not gated by oedema, which does not affect linear growth.
pub fn length_or_height_for_age(
    references: &ReferenceSet,
    sex: Sex,
    age_in_days: i64,
    loh: &NormalizedLengthOrHeight,
) -> ZscoreAndPercentile {
    if !measurement::age_in_range(age_in_days) {
        return skipped("length_or_height_for_age", "age out of range");
    }
    match loh.length_or_height().filter(|v| *v >= 1.0) {
        Some(value) => score(
            references,
            Dataset::LengthOrHeightForAge,
            sex,
            age_in_days as f64,
            value,
        ),
        None => skipped("length_or_height_for_age", "length or height unavailable"),
    }
}

/// Uses the height table for standing and the length table for recumbent
/// measurements, after normalization.
pub fn weight_for_length_or_height(
    references: &ReferenceSet,
    sex: Sex,
    age_in_days: i64,
    loh: &NormalizedLengthOrHeight,
    weight_kg: f64,
    has_oedema: bool,
) -> ZscoreAndPercentile {
    if has_oedema {
        return skipped("weight_for_length_or_height", "oedema");
    }
    if age_in_days < 0 {
        return skipped("weight_for_length_or_height", "no valid age");
    }
    if !measurement::weight_in_range(weight_kg) {
        return skipped("weight_for_length_or_height", "weight out of range");
    }
    let Some(key) = loh.length_or_height() else {
        return skipped("weight_for_length_or_height", "length or height unavailable");
    };

    let dataset = match loh.measured() {
        MeasurementPosition::Standing => Dataset::WeightForHeight,
        MeasurementPosition::Recumbent => Dataset::WeightForLength,
    };
    score(references, dataset, sex, key, weight_kg)
}

pub fn body_mass_index_for_age(
    references: &ReferenceSet,
    sex: Sex,
    age_in_days: i64,
    body_mass_index: Option<f64>,
    weight_kg: f64,
    height_cm: Option<f64>,
    has_oedema: bool,
) -> ZscoreAndPercentile {
    if has_oedema {
        return skipped("body_mass_index_for_age", "oedema");
    }
    if !measurement::age_in_range(age_in_days) {
        return skipped("body_mass_index_for_age", "age out of range");
    }
    if !(weight_kg > 0.0 && height_cm.map_or(false, |h| h > 0.0)) {
        return skipped("body_mass_index_for_age", "weight or height unavailable");
    }
    match body_mass_index {
        Some(bmi) => score(
            references,
            Dataset::BodyMassIndexForAge,
            sex,
            age_in_days as f64,
            bmi,
        ),
        None => skipped("body_mass_index_for_age", "BMI unavailable"),
    }
}

/// Not gated by oedema.
pub fn head_circumference_for_age(
    references: &ReferenceSet,
    sex: Sex,
    age_in_days: i64,
    head_circumference_cm: f64,
) -> ZscoreAndPercentile {
    if !measurement::age_in_range(age_in_days) {
        return skipped("head_circumference_for_age", "age out of range");
    }
    if !measurement::HEAD_CIRCUMFERENCE_RANGE_CM.contains(&head_circumference_cm) {
        return skipped("head_circumference_for_age", "head circumference out of range");
    }
    score(
        references,
        Dataset::HeadCircumferenceForAge,
        sex,
        age_in_days as f64,
        head_circumference_cm,
    )
}
