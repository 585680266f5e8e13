//! Adaptive Calibration
//!
//! Two bounded searches that size a measurement before it runs:
//! - `determine_iterations`: workload calls per sample, so one sample lasts
//!   longer than the minimum sample duration
//! - `determine_warm_up_samples`: untimed samples, so warm-up covers both the
//!   minimum iteration count and the minimum warm-up duration
//!
//! Both treat the invocation engine as a black box behind `Probe` and accept
//! the last estimate when the trial budget runs out.

use crate::error::Error;
use lapbench_stats::{DurationMatrix, MIN_DURATION_GUARD_SEC, StatsError};
use tracing::debug;

/// Trial rounds per search
pub const MAX_TRIALS: usize = 10;

/// Headroom applied on top of the measured shortfall
pub const SAFETY_MULTIPLIER: f64 = 1.2;

/// Largest growth factor per trial, before the safety multiplier
pub const MAX_GROWTH_PER_TRIAL: f64 = 10.0;

/// Hard cap on `iterations` and on `iterations * warm_up_samples`
pub const MAX_ITERATIONS: usize = 1_000_000;

/// Runs the workload for a given plan on one thread
pub trait Probe {
    /// Return the `1 × samples` duration matrix of one run
    fn probe(
        &mut self,
        iterations: usize,
        samples: usize,
        warm_up_samples: usize,
    ) -> Result<DurationMatrix, Error>;
}

impl<F> Probe for F
where
    F: FnMut(usize, usize, usize) -> Result<DurationMatrix, Error>,
{
    fn probe(
        &mut self,
        iterations: usize,
        samples: usize,
        warm_up_samples: usize,
    ) -> Result<DurationMatrix, Error> {
        self(iterations, samples, warm_up_samples)
    }
}

/// Find how many calls per sample exceed `min_sample_duration_sec`
pub fn determine_iterations<P: Probe + ?Sized>(
    probe: &mut P,
    min_sample_duration_sec: f64,
) -> Result<usize, Error> {
    let mut iterations = 1;
    for trial in 0..MAX_TRIALS {
        let durations = probe.probe(iterations, 2, 0)?;
        // The first sample absorbs cold-start cost.
        let duration_sec = durations
            .first()
            .and_then(|row| row.get(1))
            .ok_or(StatsError::EmptySampleSet)?
            .as_secs_f64();
        debug!(trial, iterations, duration_sec, "Calibrating iterations");

        if duration_sec > min_sample_duration_sec || iterations >= MAX_ITERATIONS {
            return Ok(iterations);
        }
        iterations = scale(iterations, min_sample_duration_sec, duration_sec, MAX_ITERATIONS);
    }
    Ok(iterations)
}

/// Find how many warm-up samples of `iterations` calls reach both minimums
pub fn determine_warm_up_samples<P: Probe + ?Sized>(
    probe: &mut P,
    iterations: usize,
    min_warm_up_iterations: usize,
    min_warm_up_duration_sec: f64,
) -> Result<usize, Error> {
    let iterations = iterations.max(1);
    let cap = (MAX_ITERATIONS / iterations).max(1);
    let mut warm_up_samples = min_warm_up_iterations.div_ceil(iterations).clamp(1, cap);

    for trial in 0..MAX_TRIALS {
        let durations = probe.probe(iterations, warm_up_samples, 0)?;
        let achieved_sec = mean_sample_sec(&durations)? * warm_up_samples as f64;
        debug!(trial, warm_up_samples, achieved_sec, "Calibrating warm-up samples");

        if achieved_sec > min_warm_up_duration_sec || warm_up_samples >= cap {
            return Ok(warm_up_samples);
        }
        warm_up_samples = scale(warm_up_samples, min_warm_up_duration_sec, achieved_sec, cap);
    }
    Ok(warm_up_samples)
}

/// Mean duration of one sample, in seconds
///
/// Linear in the number of samples; warm-up probes can hold close to
/// `MAX_ITERATIONS` of them.
fn mean_sample_sec(durations: &DurationMatrix) -> Result<f64, Error> {
    let (total_sec, count) = durations
        .iter()
        .flatten()
        .fold((0.0, 0_usize), |(total, count), d| (total + d.as_secs_f64(), count + 1));
    if count == 0 {
        return Err(StatsError::EmptySampleSet.into());
    }
    Ok(total_sec / count as f64)
}

/// Grow `current` toward `target / measured`, by at least one, up to `cap`
fn scale(current: usize, target_sec: f64, measured_sec: f64, cap: usize) -> usize {
    let multiplier =
        (target_sec / measured_sec.max(MIN_DURATION_GUARD_SEC)).min(MAX_GROWTH_PER_TRIAL)
            * SAFETY_MULTIPLIER;
    // Float-to-int casts saturate.
    let scaled = (current as f64 * multiplier).floor() as usize;
    scaled.max(current + 1).min(cap)
}
