#![forbid(unsafe_code)]

//! Core computation of WHO child growth indicators.
//!
//! This crate provides:
//! - Domain types (sex, measurement position, visit statistics)
//! - WHO reference tables of Box-Cox LMS parameters
//! - Length/height normalization and BMI
//! - LMS z-scores with ±3 SD extrapolation, and percentiles
//! - The five growth indicators for a visit
//! - Batch computation over CSV files

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod reference;
pub mod measurement;
pub mod lms;
pub mod percentile;
pub mod indicators;
pub mod report;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, OutputFormat, ReferenceConfig};
pub use reference::{Dataset, ReferenceSet};
pub use lms::Lms;
pub use measurement::NormalizedLengthOrHeight;
pub use percentile::zscore_to_percentile;
pub use indicators::{calculate_scores, calculate_scores_at};
