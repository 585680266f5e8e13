//! Descriptive Statistics
//!
//! Samples are added one at a time into a `StatisticsAccumulator`, which keeps
//! them both in insertion order and in ascending order. A single `calc()` turns
//! the accumulator into an immutable `Statistics` value; getters only exist on
//! the calculated value, so nothing can be read before the calculation.
//!
//! The median is the sorted sample at index `n / 2` (the upper-middle element for
//! even `n`). The two middle values are never averaged.

use crate::StatsError;
use serde::{Deserialize, Serialize};

/// Sample accumulator, finalized with [`StatisticsAccumulator::calc`]
#[derive(Debug, Clone, Default)]
pub struct StatisticsAccumulator {
    unsorted_samples: Vec<f64>,
    sorted_samples: Vec<f64>,
}

impl StatisticsAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty accumulator with room for `samples` values
    pub fn with_capacity(samples: usize) -> Self {
        Self {
            unsorted_samples: Vec::with_capacity(samples),
            sorted_samples: Vec::with_capacity(samples),
        }
    }

    /// Add a sample, keeping the sorted copy ordered
    pub fn add(&mut self, value: f64) {
        self.unsorted_samples.push(value);
        let pos = self
            .sorted_samples
            .partition_point(|x| x.total_cmp(&value).is_lt());
        self.sorted_samples.insert(pos, value);
    }

    /// Number of samples added so far
    pub fn len(&self) -> usize {
        self.unsorted_samples.len()
    }

    /// Whether no sample has been added
    pub fn is_empty(&self) -> bool {
        self.unsorted_samples.is_empty()
    }

    /// Compute the statistics of all added samples
    pub fn calc(self) -> Result<Statistics, StatsError> {
        let n = self.sorted_samples.len();
        let (Some(&min), Some(&max)) = (self.sorted_samples.first(), self.sorted_samples.last())
        else {
            return Err(StatsError::EmptySampleSet);
        };

        let count = n as f64;
        let mean = self.unsorted_samples.iter().sum::<f64>() / count;
        let median = self.sorted_samples[n / 2];

        let variance = if n < 2 {
            0.0
        } else {
            self.unsorted_samples
                .iter()
                .map(|x| (x - mean).powi(2))
                .sum::<f64>()
                / (n - 1) as f64
        };
        let standard_deviation = variance.sqrt();
        let standard_error = standard_deviation / count.sqrt();

        Ok(Statistics {
            unsorted_samples: self.unsorted_samples,
            sorted_samples: self.sorted_samples,
            mean,
            max,
            min,
            median,
            variance,
            standard_deviation,
            standard_error,
        })
    }
}

impl Extend<f64> for StatisticsAccumulator {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl FromIterator<f64> for StatisticsAccumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        acc.extend(iter);
        acc
    }
}

/// Calculated statistics of a sample set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    unsorted_samples: Vec<f64>,
    sorted_samples: Vec<f64>,
    mean: f64,
    max: f64,
    min: f64,
    median: f64,
    variance: f64,
    standard_deviation: f64,
    standard_error: f64,
}

impl Statistics {
    /// Compute statistics of a slice in one step
    pub fn from_samples(samples: &[f64]) -> Result<Self, StatsError> {
        samples.iter().copied().collect::<StatisticsAccumulator>().calc()
    }

    /// Samples in insertion order
    pub fn unsorted_samples(&self) -> &[f64] {
        &self.unsorted_samples
    }

    /// Samples in ascending order
    pub fn sorted_samples(&self) -> &[f64] {
        &self.sorted_samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.sorted_samples.len()
    }

    /// Always false: a calculated set holds at least one sample
    pub fn is_empty(&self) -> bool {
        self.sorted_samples.is_empty()
    }

    /// Arithmetic mean
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Largest sample
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Smallest sample
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Sorted sample at index `n / 2`
    pub fn median(&self) -> f64 {
        self.median
    }

    /// Sample variance with Bessel's correction (0 for a single sample)
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Square root of the variance
    pub fn standard_deviation(&self) -> f64 {
        self.standard_deviation
    }

    /// Standard deviation divided by `sqrt(n)`
    pub fn standard_error(&self) -> f64 {
        self.standard_error
    }
}
