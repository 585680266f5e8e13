//! Benchmark Runner
//!
//! Measures every case under every one of its conditions, once per
//! measurement config, and forwards each outcome to the reporters. A failed
//! measurement is reported and skipped; only a reporter error stops the run.

use crate::config::LapConfig;
use crate::reporter::Reporter;
use chrono::Utc;
use lapbench_core::{BenchmarkCase, MeasurementConfig, Measurer, default_measurement_configs};
use std::sync::Arc;
use tracing::{info, warn};

/// Counts of measurements at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Measurements that completed
    pub succeeded: usize,
    /// Measurements that failed
    pub failed: usize,
}

/// Drives measurements and reporting
pub struct Runner {
    measurer: Measurer,
    measurement_configs: Vec<MeasurementConfig>,
    cases: Vec<Arc<dyn BenchmarkCase>>,
    reporters: Vec<Box<dyn Reporter>>,
}

impl Runner {
    /// Runner with the default measurement configs
    pub fn new(measurer: Measurer) -> Self {
        Self {
            measurer,
            measurement_configs: default_measurement_configs(),
            cases: Vec::new(),
            reporters: Vec::new(),
        }
    }

    /// Runner set up from a configuration file
    pub fn from_config(config: &LapConfig) -> anyhow::Result<Self> {
        let measurer = Measurer::new(config.measurer.to_settings()?);
        Ok(Self::new(measurer).with_measurement_configs(config.runner.measurement_configs()?))
    }

    /// Replace the measurement configs
    pub fn with_measurement_configs(mut self, configs: Vec<MeasurementConfig>) -> Self {
        self.measurement_configs = configs;
        self
    }

    /// Register a case
    pub fn add_case(&mut self, case: Arc<dyn BenchmarkCase>) -> &mut Self {
        self.cases.push(case);
        self
    }

    /// Register a reporter
    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) -> &mut Self {
        self.reporters.push(reporter);
        self
    }

    /// Number of registered cases
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// Measure everything
    pub fn run(&mut self) -> anyhow::Result<RunSummary> {
        let mut summary = RunSummary::default();
        info!(
            cases = self.cases.len(),
            measurements = self.measurement_configs.len(),
            "Starting benchmark run"
        );

        let started = Utc::now();
        self.for_each_reporter(|r| r.experiment_starts(started))?;

        // Split borrows: reporters are mutated while cases and configs are read.
        let Self {
            measurer,
            measurement_configs,
            cases,
            reporters,
        } = &mut *self;

        for config in measurement_configs.iter() {
            notify(reporters, |r| r.measurer_starts(config.name()))?;

            for case in cases.iter() {
                let info = case.info();
                notify(reporters, |r| r.case_starts(info))?;

                for condition in case.conditions() {
                    match measurer.measure(case.as_ref(), &condition, config) {
                        Ok(measurement) => {
                            summary.succeeded += 1;
                            notify(reporters, |r| r.measurement_succeeded(&measurement))?;
                        }
                        Err(error) => {
                            summary.failed += 1;
                            warn!(case = %info, error = %error, "Measurement failed");
                            notify(reporters, |r| r.measurement_failed(info, &condition, &error))?;
                        }
                    }
                }

                notify(reporters, |r| r.case_finished(info))?;
            }

            notify(reporters, |r| r.measurer_finished(config.name()))?;
        }

        let finished = Utc::now();
        self.for_each_reporter(|r| r.experiment_finished(finished))?;

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Benchmark run finished"
        );
        Ok(summary)
    }

    fn for_each_reporter(
        &mut self,
        f: impl FnMut(&mut dyn Reporter) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        notify(&mut self.reporters, f)
    }
}

fn notify(
    reporters: &mut [Box<dyn Reporter>],
    mut f: impl FnMut(&mut dyn Reporter) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    for reporter in reporters.iter_mut() {
        f(&mut **reporter)?;
    }
    Ok(())
}
