//! Reporter Contract
//!
//! Reporters observe a run as a stream of events. Every hook has a no-op
//! default, so a reporter only implements what it cares about. A hook error
//! aborts the run.

use chrono::{DateTime, Utc};
use lapbench_core::{BenchmarkCondition, CaseInfo, Error, Measurement, MeasurerName};
use tracing::{info, warn};

/// Observer of benchmark run events
pub trait Reporter {
    /// The run begins
    fn experiment_starts(&mut self, _time_stamp: DateTime<Utc>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The run ends
    fn experiment_finished(&mut self, _time_stamp: DateTime<Utc>) -> anyhow::Result<()> {
        Ok(())
    }

    /// A measurer starts running every case
    fn measurer_starts(&mut self, _name: &MeasurerName) -> anyhow::Result<()> {
        Ok(())
    }

    /// A measurer finished every case
    fn measurer_finished(&mut self, _name: &MeasurerName) -> anyhow::Result<()> {
        Ok(())
    }

    /// A case starts running every condition
    fn case_starts(&mut self, _info: &CaseInfo) -> anyhow::Result<()> {
        Ok(())
    }

    /// A case finished every condition
    fn case_finished(&mut self, _info: &CaseInfo) -> anyhow::Result<()> {
        Ok(())
    }

    /// A measurement completed
    fn measurement_succeeded(&mut self, _measurement: &Measurement) -> anyhow::Result<()> {
        Ok(())
    }

    /// A measurement failed; the run continues
    fn measurement_failed(
        &mut self,
        _info: &CaseInfo,
        _condition: &BenchmarkCondition,
        _error: &Error,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Logs every event through `tracing`
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn experiment_starts(&mut self, time_stamp: DateTime<Utc>) -> anyhow::Result<()> {
        info!(time_stamp = %time_stamp.to_rfc3339(), "Benchmark started");
        Ok(())
    }

    fn experiment_finished(&mut self, time_stamp: DateTime<Utc>) -> anyhow::Result<()> {
        info!(time_stamp = %time_stamp.to_rfc3339(), "Benchmark finished");
        Ok(())
    }

    fn measurer_starts(&mut self, name: &MeasurerName) -> anyhow::Result<()> {
        info!(measurer = %name, "Measurer started");
        Ok(())
    }

    fn case_starts(&mut self, info: &CaseInfo) -> anyhow::Result<()> {
        info!(case = %info, "Case started");
        Ok(())
    }

    fn measurement_succeeded(&mut self, measurement: &Measurement) -> anyhow::Result<()> {
        let stat = measurement.durations_stat();
        info!(
            case = %measurement.case_info(),
            measurer = %measurement.measurer_name(),
            threads = measurement.condition().threads(),
            iterations = measurement.iterations(),
            samples = measurement.samples(),
            mean_sec = stat.mean(),
            median_sec = stat.median(),
            standard_error_sec = stat.standard_error(),
            "Measured"
        );
        Ok(())
    }

    fn measurement_failed(
        &mut self,
        info: &CaseInfo,
        condition: &BenchmarkCondition,
        error: &Error,
    ) -> anyhow::Result<()> {
        warn!(
            case = %info,
            threads = condition.threads(),
            error = %error,
            "Measurement failed"
        );
        Ok(())
    }
}
