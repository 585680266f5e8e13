//! Measurement Orchestrator
//!
//! `Measurer::measure` sizes a measurement (calibrating whatever the
//! `MeasurementConfig` leaves unset), runs the case once with that plan and
//! turns the raw durations and custom outputs into a `Measurement`.

use crate::calibration::{determine_iterations, determine_warm_up_samples};
use crate::case::{BenchmarkCase, CaseInfo};
use crate::clock::{Clock, MonotonicClock};
use crate::context::{ContextGuard, InvocationContext, Recorded};
use crate::error::Error;
use crate::invoker::ThreadableInvoker;
use crate::param::BenchmarkCondition;
use lapbench_stats::{AnalysisType, DurationMatrix, Statistics, calc_stat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Name of the measurer with `iterations` fixed to 1
pub const PROCESSING_TIME: &str = "Processing Time";

/// Name of the fully calibrated measurer
pub const MEAN_PROCESSING_TIME: &str = "Mean Processing Time";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Measurer name, e.g. `"Processing Time"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurerName(String);

impl MeasurerName {
    /// Create a name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeasurerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MeasurerName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MeasurerName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Measurer name plus optional fixed plan values; unset values are calibrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    name: MeasurerName,
    samples: Option<usize>,
    warm_up_samples: Option<usize>,
    iterations: Option<usize>,
}

impl MeasurementConfig {
    /// Config with nothing fixed
    pub fn new(name: impl Into<MeasurerName>) -> Self {
        Self {
            name: name.into(),
            samples: None,
            warm_up_samples: None,
            iterations: None,
        }
    }

    /// Fix the number of measured samples
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Fix the number of warm-up samples
    pub fn with_warm_up_samples(mut self, warm_up_samples: usize) -> Self {
        self.warm_up_samples = Some(warm_up_samples);
        self
    }

    /// Fix the workload calls per sample
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Fill every unset value from `other`
    pub fn apply_if_not_set(mut self, other: &MeasurementConfig) -> Self {
        self.samples = self.samples.or(other.samples);
        self.warm_up_samples = self.warm_up_samples.or(other.warm_up_samples);
        self.iterations = self.iterations.or(other.iterations);
        self
    }

    /// Measurer name
    pub fn name(&self) -> &MeasurerName {
        &self.name
    }

    /// Fixed measured samples
    pub fn samples(&self) -> Option<usize> {
        self.samples
    }

    /// Fixed warm-up samples
    pub fn warm_up_samples(&self) -> Option<usize> {
        self.warm_up_samples
    }

    /// Fixed iterations
    pub fn iterations(&self) -> Option<usize> {
        self.iterations
    }
}

/// `"Processing Time"` (one call per sample) and `"Mean Processing Time"`
pub fn default_measurement_configs() -> Vec<MeasurementConfig> {
    vec![
        MeasurementConfig::new(PROCESSING_TIME).with_iterations(1),
        MeasurementConfig::new(MEAN_PROCESSING_TIME),
    ]
}

/// Defaults used when a `MeasurementConfig` leaves a value unset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurerSettings {
    /// Measured samples per thread
    pub samples: usize,
    /// Each sample must last longer than this
    pub min_sample_duration: Duration,
    /// Warm-up must cover at least this many workload calls
    pub min_warm_up_iterations: usize,
    /// Warm-up must last longer than this
    pub min_warm_up_duration: Duration,
}

impl Default for MeasurerSettings {
    fn default() -> Self {
        Self {
            samples: 30,
            min_sample_duration: Duration::from_millis(30),
            min_warm_up_iterations: 1,
            min_warm_up_duration: Duration::from_millis(30),
        }
    }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Finalized custom output with statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomStatResult {
    /// Output name
    pub name: String,
    /// How cells were finalized
    pub analysis_type: AnalysisType,
    /// `threads × measured samples` finalized values
    pub values: Vec<Vec<f64>>,
    /// Statistics over every value
    pub stat: Statistics,
}

/// Result of measuring one case under one condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    case_info: CaseInfo,
    condition: BenchmarkCondition,
    measurer_name: MeasurerName,
    iterations: usize,
    samples: usize,
    warm_up_samples: usize,
    durations: DurationMatrix,
    durations_stat: Statistics,
    custom_stat_outputs: Vec<CustomStatResult>,
    custom_outputs: Vec<(String, f64)>,
}

impl Measurement {
    /// Case measured
    pub fn case_info(&self) -> &CaseInfo {
        &self.case_info
    }

    /// Condition measured under
    pub fn condition(&self) -> &BenchmarkCondition {
        &self.condition
    }

    /// Measurer that produced this
    pub fn measurer_name(&self) -> &MeasurerName {
        &self.measurer_name
    }

    /// Workload calls per sample
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Measured samples per thread
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Untimed samples run before measuring
    pub fn warm_up_samples(&self) -> usize {
        self.warm_up_samples
    }

    /// Raw `threads × samples` sample durations
    pub fn durations(&self) -> &DurationMatrix {
        &self.durations
    }

    /// Per-call time statistics, in seconds
    pub fn durations_stat(&self) -> &Statistics {
        &self.durations_stat
    }

    /// Custom outputs with statistics
    pub fn custom_stat_outputs(&self) -> &[CustomStatResult] {
        &self.custom_stat_outputs
    }

    /// Plain custom outputs
    pub fn custom_outputs(&self) -> &[(String, f64)] {
        &self.custom_outputs
    }
}

// ─── Measurer ────────────────────────────────────────────────────────────────

/// Runs calibrated measurements of benchmark cases
pub struct Measurer {
    settings: MeasurerSettings,
    clock: Arc<dyn Clock>,
}

impl Measurer {
    /// Measurer on the monotonic wall clock
    pub fn new(settings: MeasurerSettings) -> Self {
        Self::with_clock(settings, Arc::new(MonotonicClock::new()))
    }

    /// Measurer on a custom clock
    pub fn with_clock(settings: MeasurerSettings, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    /// Defaults for unset config values
    pub fn settings(&self) -> &MeasurerSettings {
        &self.settings
    }

    /// Measure `case` under `condition`
    pub fn measure(
        &self,
        case: &dyn BenchmarkCase,
        condition: &BenchmarkCondition,
        config: &MeasurementConfig,
    ) -> Result<Measurement, Error> {
        let probe_condition = condition.with_threads(1)?;
        let mut probe = |iterations: usize, samples: usize, warm_up_samples: usize| {
            self.invoke(case, &probe_condition, iterations, samples, warm_up_samples)
                .map(|recorded| recorded.durations)
        };

        let iterations = match config.iterations() {
            Some(iterations) => iterations,
            None => determine_iterations(
                &mut probe,
                self.settings.min_sample_duration.as_secs_f64(),
            )?,
        };
        let warm_up_samples = match config.warm_up_samples() {
            Some(warm_up_samples) => warm_up_samples,
            None => determine_warm_up_samples(
                &mut probe,
                iterations,
                self.settings.min_warm_up_iterations,
                self.settings.min_warm_up_duration.as_secs_f64(),
            )?,
        };
        let samples = config.samples().unwrap_or(self.settings.samples);
        let total_samples = samples.checked_add(warm_up_samples).ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "samples ({samples}) plus warm-up samples ({warm_up_samples}) overflow"
            ))
        })?;

        debug!(
            case = %case.info(),
            measurer = %config.name(),
            threads = condition.threads(),
            iterations,
            samples,
            warm_up_samples,
            "Measuring"
        );

        let recorded = self.invoke(case, condition, iterations, total_samples, warm_up_samples)?;

        let durations_stat = calc_stat(&recorded.durations, iterations)?;
        let custom_stat_outputs = recorded
            .custom_stat_outputs
            .iter()
            .map(|output| -> Result<CustomStatResult, Error> {
                output.preprocess(&recorded.durations)?;
                Ok(CustomStatResult {
                    name: output.name().to_string(),
                    analysis_type: output.analysis_type(),
                    values: output.values().map(<[_]>::to_vec).unwrap_or_default(),
                    stat: output.stat()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Measurement {
            case_info: case.info().clone(),
            condition: condition.clone(),
            measurer_name: config.name().clone(),
            iterations,
            samples,
            warm_up_samples,
            durations: recorded.durations,
            durations_stat,
            custom_stat_outputs,
            custom_outputs: recorded.custom_outputs,
        })
    }

    /// Execute the case once with a fixed plan
    fn invoke(
        &self,
        case: &dyn BenchmarkCase,
        condition: &BenchmarkCondition,
        iterations: usize,
        samples: usize,
        warm_up_samples: usize,
    ) -> Result<Recorded, Error> {
        // Reject the plan before any user code runs.
        ThreadableInvoker::new(condition.threads(), iterations, samples, warm_up_samples)?;

        let context = InvocationContext::new(
            condition.clone(),
            iterations,
            samples,
            warm_up_samples,
            Arc::clone(&self.clock),
        );
        {
            let _guard = ContextGuard::install(&context);
            case.execute(&context)?;
        }

        context
            .take_recorded()
            .ok_or_else(|| Error::NoMeasurementPerformed {
                case: case.info().to_string(),
            })
    }
}

impl Default for Measurer {
    fn default() -> Self {
        Self::new(MeasurerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::FnCase;
    use crate::clock::ManualClock;
    use crate::param::ParameterDict;
    use std::sync::Mutex;

    fn fast_settings() -> MeasurerSettings {
        MeasurerSettings {
            samples: 5,
            min_sample_duration: Duration::from_micros(50),
            min_warm_up_iterations: 1,
            min_warm_up_duration: Duration::from_micros(50),
        }
    }

    #[test]
    fn test_config_builder() {
        let config = MeasurementConfig::new("Custom")
            .with_samples(10)
            .with_iterations(3);

        assert_eq!(config.name().as_str(), "Custom");
        assert_eq!(config.samples(), Some(10));
        assert_eq!(config.iterations(), Some(3));
        assert_eq!(config.warm_up_samples(), None);
    }

    #[test]
    fn test_apply_if_not_set() {
        let config = MeasurementConfig::new("A").with_samples(10);
        let fallback = MeasurementConfig::new("B")
            .with_samples(99)
            .with_warm_up_samples(2)
            .with_iterations(7);

        let merged = config.apply_if_not_set(&fallback);

        assert_eq!(merged.name().as_str(), "A");
        assert_eq!(merged.samples(), Some(10));
        assert_eq!(merged.warm_up_samples(), Some(2));
        assert_eq!(merged.iterations(), Some(7));
    }

    #[test]
    fn test_default_measurement_configs() {
        let configs = default_measurement_configs();

        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].name().as_str(), PROCESSING_TIME);
        assert_eq!(configs[0].iterations(), Some(1));
        assert_eq!(configs[1].name().as_str(), MEAN_PROCESSING_TIME);
        assert_eq!(configs[1].iterations(), None);
    }

    #[test]
    fn test_default_settings() {
        let settings = MeasurerSettings::default();

        assert_eq!(settings.samples, 30);
        assert_eq!(settings.min_sample_duration, Duration::from_millis(30));
        assert_eq!(settings.min_warm_up_iterations, 1);
        assert_eq!(settings.min_warm_up_duration, Duration::from_millis(30));
    }

    #[test]
    fn test_measure_with_fixed_plan() {
        let clock = Arc::new(ManualClock::new());
        let measurer = Measurer::with_clock(fast_settings(), clock.clone());
        let case = FnCase::new("g", "fixed", |ctx: &InvocationContext| {
            ctx.measure(|_, _, _| clock.advance(Duration::from_micros(2)))
        });
        let config = MeasurementConfig::new("Fixed")
            .with_iterations(4)
            .with_warm_up_samples(1)
            .with_samples(3);

        let m = measurer
            .measure(&case, &BenchmarkCondition::single_thread(), &config)
            .unwrap();

        assert_eq!(m.measurer_name().as_str(), "Fixed");
        assert_eq!(m.iterations(), 4);
        assert_eq!(m.samples(), 3);
        assert_eq!(m.warm_up_samples(), 1);
        assert_eq!(m.durations(), &vec![vec![Duration::from_micros(8); 3]]);
        assert!((m.durations_stat().mean() - 2e-6).abs() < 1e-15);
        assert_eq!(m.case_info().to_string(), "g/fixed");
    }

    #[test]
    fn test_calibration_probes_on_one_thread() {
        let clock = Arc::new(ManualClock::new());
        let measurer = Measurer::with_clock(fast_settings(), clock.clone());
        let seen_threads = Mutex::new(Vec::new());
        let case = FnCase::new("g", "threads", |ctx: &InvocationContext| {
            seen_threads.lock().unwrap().push(ctx.threads());
            ctx.measure(|_, _, _| clock.advance(Duration::from_micros(1)))
        });
        let condition =
            BenchmarkCondition::new(2, ParameterDict::new().with("size", 8_u64)).unwrap();

        let m = measurer
            .measure(&case, &condition, &MeasurementConfig::new(MEAN_PROCESSING_TIME))
            .unwrap();

        let seen = seen_threads.into_inner().unwrap();
        let (last, probes) = seen.split_last().unwrap();
        assert_eq!(*last, 2);
        assert!(!probes.is_empty());
        assert!(probes.iter().all(|&t| t == 1));
        assert_eq!(m.durations().len(), 2);
        assert_eq!(m.samples(), 5);
    }

    #[test]
    fn test_calibrated_iterations_exceed_min_sample_duration() {
        let clock = Arc::new(ManualClock::new());
        let measurer = Measurer::with_clock(fast_settings(), clock.clone());
        let case = FnCase::new("g", "calibrated", |ctx: &InvocationContext| {
            ctx.measure(|_, _, _| clock.advance(Duration::from_nanos(300)))
        });

        let m = measurer
            .measure(
                &case,
                &BenchmarkCondition::single_thread(),
                &MeasurementConfig::new(MEAN_PROCESSING_TIME),
            )
            .unwrap();

        assert!(m.iterations() as f64 * 300e-9 > 50e-6);
        let warm_up_sec = (m.warm_up_samples() * m.iterations()) as f64 * 300e-9;
        assert!(warm_up_sec > 50e-6);
    }

    #[test]
    fn test_no_measurement_performed() {
        let measurer = Measurer::new(fast_settings());
        let case = FnCase::new("g", "idle", |_: &InvocationContext| Ok(()));
        let config = MeasurementConfig::new("Fixed")
            .with_iterations(1)
            .with_warm_up_samples(0);

        let err = measurer
            .measure(&case, &BenchmarkCondition::single_thread(), &config)
            .unwrap_err();

        match err {
            Error::NoMeasurementPerformed { case } => assert_eq!(case, "g/idle"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_plan_never_executes_case() {
        let measurer = Measurer::new(fast_settings());
        let executed = Mutex::new(false);
        let case = FnCase::new("g", "never", |ctx: &InvocationContext| {
            *executed.lock().unwrap() = true;
            ctx.measure(|_, _, _| ())
        });
        let config = MeasurementConfig::new("Fixed")
            .with_iterations(0)
            .with_warm_up_samples(0);

        let err = measurer
            .measure(&case, &BenchmarkCondition::single_thread(), &config)
            .unwrap_err();

        assert!(matches!(err, Error::InvalidConfiguration(_)));
        assert!(!*executed.lock().unwrap());
    }

    #[test]
    fn test_sample_count_overflow_is_invalid() {
        let measurer = Measurer::new(fast_settings());
        let executed = Mutex::new(false);
        let case = FnCase::new("g", "huge", |ctx: &InvocationContext| {
            *executed.lock().unwrap() = true;
            ctx.measure(|_, _, _| ())
        });
        let config = MeasurementConfig::new("Fixed")
            .with_iterations(1)
            .with_warm_up_samples(1)
            .with_samples(usize::MAX);

        let err = measurer
            .measure(&case, &BenchmarkCondition::single_thread(), &config)
            .unwrap_err();

        assert!(matches!(err, Error::InvalidConfiguration(_)), "{err}");
        assert!(!*executed.lock().unwrap());
    }

    #[test]
    fn test_custom_stat_outputs_are_preprocessed() {
        let clock = Arc::new(ManualClock::new());
        let measurer = Measurer::with_clock(fast_settings(), clock.clone());
        let case = FnCase::new("g", "custom", |ctx: &InvocationContext| {
            let ops = ctx.add_custom_stat("ops", AnalysisType::RatePerSec);
            let bytes = ctx.add_custom_stat("bytes", AnalysisType::Mean);
            ctx.add_custom_output("footprint", 42.0);
            ctx.measure(|t, s, _| {
                clock.advance(Duration::from_millis(1));
                ops.add(t, s, 1.0);
                bytes.add(t, s, 16.0);
            })
        });
        let config = MeasurementConfig::new("Fixed")
            .with_iterations(10)
            .with_warm_up_samples(2)
            .with_samples(4);

        let m = measurer
            .measure(&case, &BenchmarkCondition::single_thread(), &config)
            .unwrap();

        let outputs = m.custom_stat_outputs();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].name, "ops");
        assert_eq!(outputs[0].values, vec![vec![1000.0; 4]]);
        assert_eq!(outputs[1].name, "bytes");
        assert_eq!(outputs[1].stat.mean(), 16.0);
        assert_eq!(m.custom_outputs(), &[("footprint".to_string(), 42.0)]);
    }

    #[test]
    fn test_measurement_serializes() {
        let measurer = Measurer::new(fast_settings());
        let case = FnCase::new("g", "json", |ctx: &InvocationContext| {
            ctx.measure(|t, s, i| t * s * i)
        });
        let config = MeasurementConfig::new("Fixed")
            .with_iterations(2)
            .with_warm_up_samples(0)
            .with_samples(2);

        let m = measurer
            .measure(&case, &BenchmarkCondition::single_thread(), &config)
            .unwrap();
        let json = serde_json::to_value(&m).unwrap();

        assert_eq!(json["measurer_name"], "Fixed");
        assert_eq!(json["iterations"], 2);
        assert_eq!(json["case_info"]["name"], "json");
    }
}
