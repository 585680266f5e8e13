#![warn(missing_docs)]
//! lapbench Core - Measurement Engine
//!
//! This crate measures benchmark cases:
//! - `ThreadableInvoker` runs a workload on synchronized worker threads with
//!   untimed warm-up and timed samples
//! - `determine_iterations` / `determine_warm_up_samples` size a measurement
//! - `Measurer` calibrates, runs and summarizes one case under one condition
//! - `InvocationContext` is what a case sees while it runs

mod calibration;
mod case;
mod clock;
mod context;
mod error;
mod invoker;
mod measurer;
mod param;

pub use calibration::{
    MAX_GROWTH_PER_TRIAL, MAX_ITERATIONS, MAX_TRIALS, Probe, SAFETY_MULTIPLIER,
    determine_iterations, determine_warm_up_samples,
};
pub use case::{BenchmarkCase, CaseInfo, FixtureCase, Fixture, FnCase};
pub use clock::{Clock, ManualClock, MonotonicClock, StopWatch, ordering_fence};
pub use context::{InvocationContext, current_invocation_context};
pub use error::{BoxError, Error, WorkloadError};
pub use invoker::ThreadableInvoker;
pub use measurer::{
    CustomStatResult, MEAN_PROCESSING_TIME, Measurement, MeasurementConfig, Measurer,
    MeasurerName, MeasurerSettings, PROCESSING_TIME, default_measurement_configs,
};
pub use param::{
    BenchmarkCondition, FromParamValue, ParamError, ParamValue, ParameterDict, THREADS_PARAM,
};

pub use lapbench_stats::{AnalysisType, CustomStatOutput, DurationMatrix, Statistics};
