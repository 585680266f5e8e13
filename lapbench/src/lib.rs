#![warn(missing_docs)]
//! # lapbench
//!
//! Micro-benchmark harness with synchronized multi-threaded sampling and adaptive calibration.
//!
//! lapbench measures the wall-clock cost of a unit of work:
//! - **Synchronized Threads**: Workers start together behind a barrier and time their own samples
//! - **Warm-Up**: Untimed leading samples absorb cold caches and lazy initialization
//! - **Adaptive Calibration**: Iterations per sample and warm-up length are sized automatically
//! - **Statistics**: Mean, median, variance, standard error per call, in seconds
//! - **Custom Outputs**: Per-sample user metrics (mean per call or rate per second)
//! - **Fail-Late Runs**: A failing or panicking case is reported and the run moves on
//!
//! ## Quick Start
//!
//! ```ignore
//! use lapbench::prelude::*;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(false);
//!
//!     let case = FnCase::new("containers", "vec_push", |ctx: &InvocationContext| {
//!         let len: usize = ctx.get_param("len")?;
//!         ctx.measure(|_, _, _| (0..len).collect::<Vec<_>>())
//!     })
//!     .with_conditions(vec![BenchmarkCondition::from_params(
//!         ParameterDict::new().with("len", 1024_u64).with("threads", 4_u64),
//!     )?]);
//!
//!     let mut runner = Runner::new(Measurer::default());
//!     runner.add_case(Arc::new(case));
//!     runner.add_reporter(Box::new(TracingReporter));
//!     runner.run()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Outputs
//!
//! ```ignore
//! let case = FnCase::new("io", "parse", |ctx: &InvocationContext| {
//!     let bytes = ctx.add_custom_stat("bytes/s", AnalysisType::RatePerSec);
//!     ctx.measure(|thread, sample, _| bytes.add(thread, sample, parse_chunk() as f64))
//! });
//! ```

// Re-export core types
pub use lapbench_core::{
    BenchmarkCase, BenchmarkCondition, BoxError, CaseInfo, Clock, CustomStatResult, Error,
    Fixture, FixtureCase, FnCase, FromParamValue, InvocationContext, MEAN_PROCESSING_TIME,
    ManualClock, Measurement, MeasurementConfig, Measurer, MeasurerName, MeasurerSettings,
    MonotonicClock, PROCESSING_TIME, ParamError, ParamValue, ParameterDict, Probe, StopWatch,
    THREADS_PARAM, ThreadableInvoker, WorkloadError, current_invocation_context,
    default_measurement_configs, determine_iterations, determine_warm_up_samples, ordering_fence,
};

// Re-export stats
pub use lapbench_stats::{
    AnalysisType, CustomStatOutput, DurationMatrix, Statistics, StatisticsAccumulator, StatsError,
    calc_stat, calc_stat_values,
};

// Re-export runner
pub use lapbench_runner::{LapConfig, Reporter, RunSummary, Runner, TracingReporter, init_logging};

/// Calibration limits
pub mod calibration {
    pub use lapbench_core::{MAX_GROWTH_PER_TRIAL, MAX_ITERATIONS, MAX_TRIALS, SAFETY_MULTIPLIER};
    pub use lapbench_stats::MIN_DURATION_GUARD_SEC;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AnalysisType, BenchmarkCase, BenchmarkCondition, CaseInfo, Error, Fixture, FixtureCase,
        FnCase, InvocationContext, Measurement, MeasurementConfig, Measurer, MeasurerSettings,
        ParameterDict, Reporter, Runner, TracingReporter, init_logging,
    };
}
