use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Knobs of the adaptive frame scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Integer factor both the query image and every scored frame are
    /// divided by before comparison.
    #[serde(default = "default_downsample")]
    pub downsample: u32,
    /// Initial skip distance (frames bypassed between two scored frames).
    #[serde(default = "default_skip_start")]
    pub start: u32,
    /// Lower bound on the skip distance.
    #[serde(default = "default_skip_floor")]
    pub floor: u32,
    /// Upper bound on the skip distance.
    #[serde(default = "default_skip_ceil")]
    pub ceil: u32,
    /// Multiplier turning a score delta into a skip-distance delta. Large
    /// values amplify small score swings into large sampling-density changes.
    #[serde(default = "default_skip_step")]
    pub step: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsConfig {
    /// How many best matches to report.
    #[serde(default = "default_result_count")]
    pub count: usize,
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            downsample: default_downsample(),
            start: default_skip_start(),
            floor: default_skip_floor(),
            ceil: default_skip_ceil(),
            step: default_skip_step(),
        }
    }
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            count: default_result_count(),
            out_dir: default_out_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Reject out-of-range parameters before any scan starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.downsample == 0 {
            return Err(ConfigError::Invalid(
                "scan.downsample must be at least 1".into(),
            ));
        }
        if self.scan.floor > self.scan.ceil {
            return Err(ConfigError::Invalid(format!(
                "scan.floor ({}) exceeds scan.ceil ({})",
                self.scan.floor, self.scan.ceil
            )));
        }
        if self.scan.start < self.scan.floor || self.scan.start > self.scan.ceil {
            return Err(ConfigError::Invalid(format!(
                "scan.start ({}) outside [{}, {}]",
                self.scan.start, self.scan.floor, self.scan.ceil
            )));
        }
        if self.results.count == 0 {
            return Err(ConfigError::Invalid(
                "results.count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// Default value functions
fn default_downsample() -> u32 {
    10
}
fn default_skip_start() -> u32 {
    40
}
fn default_skip_floor() -> u32 {
    1
}
fn default_skip_ceil() -> u32 {
    200
}
fn default_skip_step() -> u32 {
    1000
}
fn default_result_count() -> usize {
    20
}
fn default_out_dir() -> String {
    "results".into()
}
fn default_log_level() -> String {
    "info".into()
}
