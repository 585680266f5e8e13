//! Configuration loading from lapbench.toml
//!
//! lapbench configuration can be specified in a `lapbench.toml` file in the project root.
//! The configuration is automatically discovered by walking up from the current directory.

use lapbench_core::{MeasurementConfig, MeasurerSettings, default_measurement_configs};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// File name searched for by [`LapConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "lapbench.toml";

/// lapbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LapConfig {
    /// Measurer defaults
    #[serde(default)]
    pub measurer: MeasurerConfig,
    /// Runner behaviour
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Defaults for values a measurement config leaves unset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurerConfig {
    /// Measured samples per thread
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Minimum duration of one sample (e.g., "30ms")
    #[serde(default = "default_min_sample_duration")]
    pub min_sample_duration: String,
    /// Minimum workload calls during warm-up
    #[serde(default = "default_min_warm_up_iterations")]
    pub min_warm_up_iterations: usize,
    /// Minimum warm-up duration (e.g., "30ms")
    #[serde(default = "default_min_warm_up_duration")]
    pub min_warm_up_duration: String,
}

impl Default for MeasurerConfig {
    fn default() -> Self {
        Self {
            samples: default_samples(),
            min_sample_duration: default_min_sample_duration(),
            min_warm_up_iterations: default_min_warm_up_iterations(),
            min_warm_up_duration: default_min_warm_up_duration(),
        }
    }
}

fn default_samples() -> usize {
    30
}
fn default_min_sample_duration() -> String {
    "30ms".to_string()
}
fn default_min_warm_up_iterations() -> usize {
    1
}
fn default_min_warm_up_duration() -> String {
    "30ms".to_string()
}

impl MeasurerConfig {
    /// Convert into measurer settings, parsing the duration strings
    pub fn to_settings(&self) -> anyhow::Result<MeasurerSettings> {
        Ok(MeasurerSettings {
            samples: self.samples,
            min_sample_duration: LapConfig::parse_duration(&self.min_sample_duration)?,
            min_warm_up_iterations: self.min_warm_up_iterations,
            min_warm_up_duration: LapConfig::parse_duration(&self.min_warm_up_duration)?,
        })
    }
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RunnerConfig {
    /// Debug-level logging
    #[serde(default)]
    pub verbose: bool,
    /// Measurers to run, by name (None = all defaults)
    #[serde(default)]
    pub measurements: Option<Vec<String>>,
}

impl RunnerConfig {
    /// Default measurement configs, restricted to `measurements` when set
    pub fn measurement_configs(&self) -> anyhow::Result<Vec<MeasurementConfig>> {
        let defaults = default_measurement_configs();
        let Some(names) = &self.measurements else {
            return Ok(defaults);
        };

        names
            .iter()
            .map(|name| {
                defaults
                    .iter()
                    .find(|config| config.name().as_str() == name)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("Unknown measurement: {}", name))
            })
            .collect()
    }
}

impl LapConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let dir = std::env::current_dir().ok()?;
        Self::discover_from(&dir)
    }

    /// Walk up from `start` looking for `lapbench.toml`
    pub fn discover_from(start: &Path) -> Option<Self> {
        let mut dir = start.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# lapbench Configuration

[measurer]
# Measured samples per thread
samples = 30
# Each sample must last longer than this (calibrates iterations per sample)
min_sample_duration = "30ms"
# Warm-up must cover at least this many workload calls
min_warm_up_iterations = 1
# Warm-up must last longer than this
min_warm_up_duration = "30ms"

[runner]
# Debug-level logging
verbose = false
# Measurers to run (uncomment to restrict)
# measurements = ["Processing Time", "Mean Processing Time"]
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m")
    pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration number: {}", num_part));
        }

        let nanos_per_unit: f64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" | "min" => 60e9,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok(Duration::from_nanos((value * nanos_per_unit) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LapConfig::default();
        assert_eq!(config.measurer.samples, 30);
        assert_eq!(config.measurer.min_sample_duration, "30ms");
        assert_eq!(config.measurer.min_warm_up_iterations, 1);
        assert!(!config.runner.verbose);
        assert!(config.runner.measurements.is_none());
    }

    #[test]
    fn test_default_settings_match_measurer() {
        let settings = LapConfig::default().measurer.to_settings().unwrap();
        assert_eq!(settings, MeasurerSettings::default());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(LapConfig::parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(LapConfig::parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(LapConfig::parse_duration("100us").unwrap(), Duration::from_micros(100));
        assert_eq!(LapConfig::parse_duration("1000ns").unwrap(), Duration::from_nanos(1000));
        assert_eq!(LapConfig::parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(LapConfig::parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(LapConfig::parse_duration("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(LapConfig::parse_duration("").is_err());
        assert!(LapConfig::parse_duration("abc").is_err());
        assert!(LapConfig::parse_duration("5h").is_err());
        assert!(LapConfig::parse_duration("-1s").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [measurer]
            samples = 10
            min_sample_duration = "1ms"

            [runner]
            measurements = ["Processing Time"]
        "#;

        let config: LapConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.measurer.samples, 10);
        assert_eq!(config.measurer.min_sample_duration, "1ms");
        // Defaults should still apply
        assert_eq!(config.measurer.min_warm_up_duration, "30ms");
        assert!(!config.runner.verbose);

        let configs = config.runner.measurement_configs().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].iterations(), Some(1));
    }

    #[test]
    fn test_unknown_measurement() {
        let runner = RunnerConfig {
            measurements: Some(vec!["Throughput".to_string()]),
            ..Default::default()
        };
        assert!(runner.measurement_configs().is_err());
    }

    #[test]
    fn test_default_toml_parses_to_defaults() {
        let config: LapConfig = toml::from_str(&LapConfig::default_toml()).unwrap();
        assert_eq!(config, LapConfig::default());
    }

    #[test]
    fn test_discover_from() {
        let root = std::env::temp_dir().join(format!("lapbench-config-{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(CONFIG_FILE_NAME), "[measurer]\nsamples = 7\n").unwrap();

        let config = LapConfig::discover_from(&nested).unwrap();
        assert_eq!(config.measurer.samples, 7);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
