#![warn(missing_docs)]
//! lapbench Statistical Engine
//!
//! Turns raw benchmark samples into descriptive statistics:
//! - `StatisticsAccumulator` / `Statistics` for any flat sample set
//! - `calc_stat` for `threads × samples` duration matrices (per-iteration cost)
//! - `CustomStatOutput` for user-declared metrics recorded inside the timed loop

mod calc_stat;
mod custom_output;
mod statistics;

pub use calc_stat::{DurationMatrix, calc_stat, calc_stat_values};
pub use custom_output::{AnalysisType, CustomStatOutput};
pub use statistics::{Statistics, StatisticsAccumulator};

use thiserror::Error;

/// Smallest duration (seconds) used as a denominator.
///
/// Guards rate computations against zero-length samples so they stay finite.
pub const MIN_DURATION_GUARD_SEC: f64 = 1e-9;

/// Errors from statistics computation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    /// No sample was added before calculation
    #[error("No sample for statistics")]
    EmptySampleSet,

    /// Input dimensions do not match the accumulator
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Expected shape description
        expected: String,
        /// Actual shape description
        got: String,
    },

    /// `stat()` was read before `preprocess()`
    #[error("Custom output `{0}` has not been preprocessed")]
    NotPreprocessed(String),

    /// `preprocess()` was called more than once
    #[error("Custom output `{0}` was already preprocessed")]
    AlreadyPreprocessed(String),
}
