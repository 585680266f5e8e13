//! Concurrent Invocation Engine
//!
//! Runs a workload `threads × samples × iterations` times and times every
//! measured sample:
//!
//! - one thread runs inline on the caller, with no spawn and no barrier
//! - more threads are scoped workers released together by a barrier
//! - warm-up samples run first and are never timed
//! - each measured sample is `iterations` calls between two compiler fences,
//!   followed by one stop-watch lap
//!
//! Each worker hands back its own `Result` through its join handle. Panics and
//! workload errors are captured per worker; after every worker is joined the
//! first failure by thread index is returned.

use crate::clock::{Clock, StopWatch, ordering_fence};
use crate::error::{BoxError, Error, WorkloadError};
use lapbench_stats::DurationMatrix;
use std::convert::Infallible;
use std::hint::black_box;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Barrier;
use std::time::Duration;
use tracing::{debug, error};

type WorkerResult = Result<Vec<Duration>, WorkloadError>;

/// Validated invocation plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadableInvoker {
    threads: usize,
    iterations: usize,
    samples: usize,
    warm_up_samples: usize,
}

impl ThreadableInvoker {
    /// Validate a plan
    ///
    /// `samples` counts every sample round, warm-up included, so it must be
    /// larger than `warm_up_samples`.
    pub fn new(
        threads: usize,
        iterations: usize,
        samples: usize,
        warm_up_samples: usize,
    ) -> Result<Self, Error> {
        if threads == 0 {
            return Err(Error::InvalidConfiguration(
                "threads must be at least 1".to_string(),
            ));
        }
        if iterations == 0 {
            return Err(Error::InvalidConfiguration(
                "iterations must be at least 1".to_string(),
            ));
        }
        if samples == 0 {
            return Err(Error::InvalidConfiguration(
                "samples must be at least 1".to_string(),
            ));
        }
        if samples <= warm_up_samples {
            return Err(Error::InvalidConfiguration(format!(
                "samples ({samples}) must exceed warm-up samples ({warm_up_samples})"
            )));
        }
        Ok(Self {
            threads,
            iterations,
            samples,
            warm_up_samples,
        })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Workload calls per sample
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Sample rounds including warm-up
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Untimed leading sample rounds
    pub fn warm_up_samples(&self) -> usize {
        self.warm_up_samples
    }

    /// Timed sample rounds per thread
    pub fn measured_samples(&self) -> usize {
        self.samples - self.warm_up_samples
    }

    /// Run an infallible workload
    ///
    /// A panicking workload still yields `Error::Workload`.
    pub fn measure<F, R>(&self, clock: &dyn Clock, work: F) -> Result<DurationMatrix, Error>
    where
        F: Fn(usize, usize, usize) -> R + Sync,
    {
        self.try_measure(clock, |t, s, i| Ok::<R, Infallible>(work(t, s, i)))
    }

    /// Run a fallible workload
    ///
    /// `work(thread_index, sample_index, iteration_index)` is called exactly
    /// once per triple unless it fails; a failure stops that worker only.
    pub fn try_measure<F, R, E>(&self, clock: &dyn Clock, work: F) -> Result<DurationMatrix, Error>
    where
        F: Fn(usize, usize, usize) -> Result<R, E> + Sync,
        E: Into<BoxError>,
    {
        debug!(
            threads = self.threads,
            iterations = self.iterations,
            samples = self.samples,
            warm_up_samples = self.warm_up_samples,
            "Invoking workload"
        );

        let results: Vec<WorkerResult> = if self.threads == 1 {
            vec![self.run_worker(clock, &work, 0)]
        } else {
            self.run_workers(clock, &work)
        };

        let mut matrix = Vec::with_capacity(self.threads);
        for (thread_index, result) in results.into_iter().enumerate() {
            match result {
                Ok(durations) => matrix.push(durations),
                Err(source) => {
                    return Err(Error::Workload {
                        thread_index,
                        source,
                    });
                }
            }
        }
        Ok(matrix)
    }

    fn run_workers<F, R, E>(&self, clock: &dyn Clock, work: &F) -> Vec<WorkerResult>
    where
        F: Fn(usize, usize, usize) -> Result<R, E> + Sync,
        E: Into<BoxError>,
    {
        let barrier = Barrier::new(self.threads);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.threads)
                .map(|thread_index| {
                    let barrier = &barrier;
                    let spawned = std::thread::Builder::new()
                        .name(format!("lapbench-worker-{thread_index}"))
                        .spawn_scoped(scope, move || {
                            barrier.wait();
                            self.run_worker(clock, work, thread_index)
                        });
                    match spawned {
                        Ok(handle) => handle,
                        Err(err) => {
                            // Workers already spawned are parked on the barrier.
                            error!(thread_index, error = %err, "Failed to spawn benchmark worker");
                            std::process::abort();
                        }
                    }
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| Err(WorkloadError::from_panic(panic)))
                })
                .collect()
        })
    }

    fn run_worker<F, R, E>(&self, clock: &dyn Clock, work: &F, thread_index: usize) -> WorkerResult
    where
        F: Fn(usize, usize, usize) -> Result<R, E>,
        E: Into<BoxError>,
    {
        let iterations = self.iterations;
        let run = || -> Result<Vec<Duration>, E> {
            for sample_index in 0..self.warm_up_samples {
                ordering_fence();
                for iteration_index in 0..iterations {
                    black_box(work(thread_index, sample_index, iteration_index)?);
                }
                ordering_fence();
            }

            let mut watch = StopWatch::start(clock, self.measured_samples());
            for sample_index in self.warm_up_samples..self.samples {
                ordering_fence();
                for iteration_index in 0..iterations {
                    black_box(work(thread_index, sample_index, iteration_index)?);
                }
                ordering_fence();
                watch.lap();
            }
            Ok(watch.durations())
        };

        match catch_unwind(AssertUnwindSafe(run)) {
            Ok(Ok(durations)) => Ok(durations),
            Ok(Err(err)) => Err(WorkloadError::Failed(err.into())),
            Err(panic) => Err(WorkloadError::from_panic(panic)),
        }
    }
}
