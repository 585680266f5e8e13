//! Statistics over `threads × samples` matrices
//!
//! Matrices are flattened thread-major: every sample of thread 0, then every
//! sample of thread 1, and so on.

use crate::{StatisticsAccumulator, Statistics, StatsError};
use std::time::Duration;

/// Per-thread sequences of per-sample durations (`threads × samples`)
pub type DurationMatrix = Vec<Vec<Duration>>;

/// Compute per-iteration statistics of a duration matrix
///
/// Each duration is converted to seconds and divided by `iterations`, the
/// number of workload calls that made up one sample.
///
/// # Errors
/// Returns `StatsError::EmptySampleSet` if the matrix or its first row is empty.
pub fn calc_stat(durations: &[Vec<Duration>], iterations: usize) -> Result<Statistics, StatsError> {
    let samples = first_row_len(durations)?;

    let inv_iterations = 1.0 / iterations.max(1) as f64;
    let mut acc = StatisticsAccumulator::with_capacity(durations.len() * samples);
    for per_thread in durations {
        for duration in per_thread {
            acc.add(duration.as_secs_f64() * inv_iterations);
        }
    }
    acc.calc()
}

/// Compute statistics of a plain value matrix
///
/// # Errors
/// Returns `StatsError::EmptySampleSet` if the matrix or its first row is empty.
pub fn calc_stat_values(values: &[Vec<f64>]) -> Result<Statistics, StatsError> {
    let samples = first_row_len(values)?;

    let mut acc = StatisticsAccumulator::with_capacity(values.len() * samples);
    for per_thread in values {
        acc.extend(per_thread.iter().copied());
    }
    acc.calc()
}

fn first_row_len<T>(matrix: &[Vec<T>]) -> Result<usize, StatsError> {
    match matrix.first() {
        Some(row) if !row.is_empty() => Ok(row.len()),
        _ => Err(StatsError::EmptySampleSet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn secs(v: f64) -> Duration {
        Duration::from_secs_f64(v)
    }

    #[test]
    fn test_calc_stat_divides_by_iterations() {
        let durations = vec![vec![secs(4.0), secs(12.0)], vec![secs(2.0), secs(6.0)]];
        let stat = calc_stat(&durations, 2).unwrap();

        assert_eq!(stat.unsorted_samples(), &[2.0, 6.0, 1.0, 3.0]);
        assert_eq!(stat.sorted_samples(), &[1.0, 2.0, 3.0, 6.0]);
        assert!((stat.mean() - 3.0).abs() < 1e-12);
        assert_eq!(stat.max(), 6.0);
        assert_eq!(stat.min(), 1.0);
        // Upper-middle element of four samples.
        assert_eq!(stat.median(), 3.0);
    }

    #[test]
    fn test_calc_stat_matches_manual_accumulation() {
        let mut rng = rand::thread_rng();

        for _ in 0..20 {
            let threads = rng.gen_range(1..5);
            let samples = rng.gen_range(1..20);
            let iterations = rng.gen_range(1..1000);
            let durations: DurationMatrix = (0..threads)
                .map(|_| {
                    (0..samples)
                        .map(|_| Duration::from_nanos(rng.gen_range(0..10_000_000)))
                        .collect()
                })
                .collect();

            let mut acc = StatisticsAccumulator::new();
            for row in &durations {
                for d in row {
                    acc.add(d.as_secs_f64() * (1.0 / iterations as f64));
                }
            }
            let expected = acc.calc().unwrap();

            assert_eq!(calc_stat(&durations, iterations).unwrap(), expected);
        }
    }

    #[test]
    fn test_calc_stat_empty() {
        assert_eq!(calc_stat(&[], 1), Err(StatsError::EmptySampleSet));
        assert_eq!(
            calc_stat(&[Vec::new(), vec![secs(1.0)]], 1),
            Err(StatsError::EmptySampleSet)
        );
    }

    #[test]
    fn test_calc_stat_values() {
        let stat = calc_stat_values(&[vec![1.0, 5.0], vec![3.0]]).unwrap();

        assert_eq!(stat.unsorted_samples(), &[1.0, 5.0, 3.0]);
        assert!((stat.mean() - 3.0).abs() < 1e-12);
        assert_eq!(calc_stat_values(&[]), Err(StatsError::EmptySampleSet));
    }
}
