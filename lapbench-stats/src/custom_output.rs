//! Custom Outputs with Statistics
//!
//! A `CustomStatOutput` is a `threads × samples` grid of accumulators written from
//! inside the timed workload. The grid covers every sample round, warm-up
//! included, so the workload can pass its sample index straight through.
//!
//! Each cell is written by exactly one worker thread (the one owning that thread
//! index), so cells are plain relaxed atomics: no locks and no read-modify-write
//! contention inside the timed loop.
//!
//! After the run, `preprocess` drops the warm-up columns and finalizes every cell
//! according to its `AnalysisType`. Only then can `stat` be read.

use crate::{MIN_DURATION_GUARD_SEC, Statistics, StatsError, calc_stat_values};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// How accumulated cell values are turned into samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Mean value per iteration: accumulated value divided by the iteration count
    #[default]
    Mean,
    /// Rate per second: accumulated value divided by the sample's wall-clock duration
    RatePerSec,
}

/// Accumulator for a user-declared metric recorded alongside timing
#[derive(Debug)]
pub struct CustomStatOutput {
    name: String,
    threads: usize,
    samples: usize,
    warm_up_samples: usize,
    iterations: usize,
    analysis_type: AnalysisType,
    /// f64 bit patterns, thread-major
    cells: Box<[AtomicU64]>,
    processed: OnceLock<Vec<Vec<f64>>>,
}

impl CustomStatOutput {
    /// Create a zeroed accumulator
    ///
    /// `samples` counts every sample round including the `warm_up_samples` ones.
    pub fn new(
        name: impl Into<String>,
        threads: usize,
        samples: usize,
        warm_up_samples: usize,
        iterations: usize,
        analysis_type: AnalysisType,
    ) -> Self {
        let cells = (0..threads * samples)
            .map(|_| AtomicU64::new(0.0_f64.to_bits()))
            .collect();
        Self {
            name: name.into(),
            threads,
            samples,
            warm_up_samples,
            iterations,
            analysis_type,
            cells,
            processed: OnceLock::new(),
        }
    }

    /// Add a value to the `(thread_index, sample_index)` cell
    ///
    /// Values added to the same cell are summed.
    ///
    /// # Panics
    /// Panics if either index is outside the grid.
    #[inline]
    pub fn add(&self, thread_index: usize, sample_index: usize, value: f64) {
        assert!(
            thread_index < self.threads && sample_index < self.samples,
            "custom output `{}`: cell ({thread_index}, {sample_index}) outside {}x{} grid",
            self.name,
            self.threads,
            self.samples,
        );
        let cell = &self.cells[thread_index * self.samples + sample_index];
        let current = f64::from_bits(cell.load(Ordering::Relaxed));
        cell.store((current + value).to_bits(), Ordering::Relaxed);
    }

    /// Finalize the measured cells using the durations of the same run
    ///
    /// `durations` must be the `threads × (samples - warm_up_samples)` matrix
    /// produced by the run that filled this output.
    pub fn preprocess(&self, durations: &[Vec<Duration>]) -> Result<(), StatsError> {
        if self.processed.get().is_some() {
            return Err(StatsError::AlreadyPreprocessed(self.name.clone()));
        }

        let measured = self.samples.saturating_sub(self.warm_up_samples);
        let shape_ok = durations.len() == self.threads
            && durations.iter().all(|row| row.len() == measured);
        if !shape_ok {
            return Err(StatsError::ShapeMismatch {
                expected: format!("{}x{}", self.threads, measured),
                got: format!(
                    "{}x{:?}",
                    durations.len(),
                    durations.iter().map(Vec::len).collect::<Vec<_>>()
                ),
            });
        }

        let iterations = self.iterations.max(1) as f64;
        let values = durations
            .iter()
            .enumerate()
            .map(|(thread_index, per_thread)| {
                per_thread
                    .iter()
                    .enumerate()
                    .map(|(j, duration)| {
                        let value = self.cell(thread_index, j + self.warm_up_samples);
                        match self.analysis_type {
                            AnalysisType::Mean => value / iterations,
                            AnalysisType::RatePerSec => {
                                value / duration.as_secs_f64().max(MIN_DURATION_GUARD_SEC)
                            }
                        }
                    })
                    .collect()
            })
            .collect();

        self.processed
            .set(values)
            .map_err(|_| StatsError::AlreadyPreprocessed(self.name.clone()))
    }

    /// Statistics over every finalized cell
    pub fn stat(&self) -> Result<Statistics, StatsError> {
        let values = self
            .processed
            .get()
            .ok_or_else(|| StatsError::NotPreprocessed(self.name.clone()))?;
        calc_stat_values(values)
    }

    /// Finalized `threads × measured samples` values, once preprocessed
    pub fn values(&self) -> Option<&[Vec<f64>]> {
        self.processed.get().map(Vec::as_slice)
    }

    /// Snapshot of the raw accumulated grid, warm-up columns included
    pub fn data(&self) -> Vec<Vec<f64>> {
        (0..self.threads)
            .map(|t| (0..self.samples).map(|s| self.cell(t, s)).collect())
            .collect()
    }

    /// Output name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Analysis applied by `preprocess`
    pub fn analysis_type(&self) -> AnalysisType {
        self.analysis_type
    }

    fn cell(&self, thread_index: usize, sample_index: usize) -> f64 {
        let cell = &self.cells[thread_index * self.samples + sample_index];
        f64::from_bits(cell.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(v: f64) -> Duration {
        Duration::from_secs_f64(v)
    }

    #[test]
    fn test_construct() {
        let output = CustomStatOutput::new("CustomStat", 2, 3, 2, 4, AnalysisType::Mean);

        assert_eq!(output.name(), "CustomStat");
        assert_eq!(output.analysis_type(), AnalysisType::Mean);
        assert_eq!(output.data(), vec![vec![0.0; 3]; 2]);
        assert!(output.values().is_none());
    }

    #[test]
    fn test_mean_statistics() {
        let output = CustomStatOutput::new("CustomStat", 2, 3, 1, 4, AnalysisType::Mean);
        let grid = [
            [[1.0, 1.0, 1.0, 1.0], [1.0, 3.0, 1.0, 3.0], [3.0, 3.0, 3.0, 3.0]],
            [[5.0, 5.0, 5.0, 5.0], [5.0, 5.0, 7.0, 7.0], [7.0, 7.0, 7.0, 7.0]],
        ];
        for (t, per_thread) in grid.iter().enumerate() {
            for (s, per_sample) in per_thread.iter().enumerate() {
                for &v in per_sample {
                    output.add(t, s, v);
                }
            }
        }

        let durations = vec![vec![secs(2.0), secs(1.0)], vec![secs(2.0), secs(1.0)]];
        output.preprocess(&durations).unwrap();
        let stat = output.stat().unwrap();

        assert!((stat.mean() - 4.5).abs() < 1e-12);
        assert_eq!(stat.sorted_samples(), &[2.0, 3.0, 6.0, 7.0]);
    }

    #[test]
    fn test_rate_per_sec_statistics() {
        let output = CustomStatOutput::new("CustomStat", 1, 3, 1, 1, AnalysisType::RatePerSec);
        output.add(0, 0, 1.0);
        output.add(0, 1, 1.0);
        output.add(0, 2, 2.0);

        output.preprocess(&[vec![secs(2.0), secs(1.0)]]).unwrap();
        let stat = output.stat().unwrap();

        assert_eq!(stat.sorted_samples(), &[0.5, 2.0]);
    }

    #[test]
    fn test_rate_per_sec_with_zero_duration_is_finite() {
        let output = CustomStatOutput::new("ops", 1, 1, 0, 10, AnalysisType::RatePerSec);
        for _ in 0..10 {
            output.add(0, 0, 1.0);
        }

        output.preprocess(&[vec![Duration::ZERO]]).unwrap();
        let stat = output.stat().unwrap();

        assert!(stat.mean().is_finite());
        assert!(stat.mean() > 1e9);
    }

    #[test]
    fn test_stat_requires_preprocess() {
        let output = CustomStatOutput::new("x", 1, 1, 0, 1, AnalysisType::Mean);

        assert_eq!(
            output.stat().unwrap_err(),
            StatsError::NotPreprocessed("x".to_string())
        );
    }

    #[test]
    fn test_preprocess_only_once() {
        let output = CustomStatOutput::new("x", 1, 1, 0, 1, AnalysisType::Mean);
        let durations = vec![vec![secs(1.0)]];

        output.preprocess(&durations).unwrap();
        assert_eq!(
            output.preprocess(&durations),
            Err(StatsError::AlreadyPreprocessed("x".to_string()))
        );
    }

    #[test]
    fn test_preprocess_rejects_wrong_shape() {
        let output = CustomStatOutput::new("x", 2, 3, 1, 1, AnalysisType::Mean);

        let result = output.preprocess(&[vec![secs(1.0), secs(1.0)]]);
        assert!(matches!(result, Err(StatsError::ShapeMismatch { .. })));
    }

    #[test]
    #[should_panic(expected = "outside 1x2 grid")]
    fn test_add_out_of_range_panics() {
        let output = CustomStatOutput::new("x", 1, 2, 0, 1, AnalysisType::Mean);
        output.add(0, 2, 1.0);
    }

    #[test]
    fn test_concurrent_adds_to_distinct_rows() {
        let output = CustomStatOutput::new("x", 4, 2, 0, 1000, AnalysisType::Mean);

        std::thread::scope(|s| {
            for t in 0..4 {
                let output = &output;
                s.spawn(move || {
                    for sample in 0..2 {
                        for _ in 0..1000 {
                            output.add(t, sample, t as f64);
                        }
                    }
                });
            }
        });

        output
            .preprocess(&vec![vec![secs(1.0), secs(1.0)]; 4])
            .unwrap();
        let values = output.values().unwrap();
        for (t, row) in values.iter().enumerate() {
            assert_eq!(row, &vec![t as f64; 2]);
        }
    }
}
