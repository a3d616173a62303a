//! Configuration for the rating tool.
//!
//! Supports both environment variables and a YAML config file.
//! Environment variables take precedence over config file values;
//! CLI flags (applied by the binary) take precedence over both.

use crate::error::{RaterError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Fact source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// JSON file with the manually curated ground-truth facts.
    pub manual_file: PathBuf,

    /// JSON file with the AI assistant's extracted facts.
    pub model_file: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            manual_file: PathBuf::from("key_points/manual_answer_key_facts.json"),
            model_file: PathBuf::from("key_points/model_answer_key_facts.json"),
        }
    }
}

/// Sampling configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Fraction of joined questions to draw, in (0, 1].
    #[serde(default = "default_fraction")]
    pub fraction: f64,

    /// Seed fixing the sample and its order.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_fraction() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    42
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            fraction: default_fraction(),
            seed: default_seed(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON file the evaluation records are written to (full overwrite).
    pub results_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_file: PathBuf::from("evaluation_results.json"),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Input fact sources.
    pub sources: SourcesConfig,
    /// Sampling settings.
    pub sample: SampleConfig,
    /// Output settings.
    pub output: OutputConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    sources: Option<SourcesFileSection>,
    sample: Option<SampleFileSection>,
    output: Option<OutputFileSection>,
}

#[derive(Debug, Deserialize)]
struct SourcesFileSection {
    manual_file: Option<PathBuf>,
    model_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct SampleFileSection {
    fraction: Option<f64>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OutputFileSection {
    results_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (QA_RATER_MANUAL_FILE, QA_RATER_MODEL_FILE,
    ///    QA_RATER_RESULTS_FILE, QA_RATER_SAMPLE_FRACTION, QA_RATER_SAMPLE_SEED)
    /// 2. Config file (~/.config/qa-rater/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file first
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        // Override with environment variables
        if let Ok(manual_file) = env::var("QA_RATER_MANUAL_FILE") {
            config.sources.manual_file = PathBuf::from(manual_file);
        }

        if let Ok(model_file) = env::var("QA_RATER_MODEL_FILE") {
            config.sources.model_file = PathBuf::from(model_file);
        }

        if let Ok(results_file) = env::var("QA_RATER_RESULTS_FILE") {
            config.output.results_file = PathBuf::from(results_file);
        }

        if let Ok(fraction) = env::var("QA_RATER_SAMPLE_FRACTION") {
            if let Ok(fraction) = fraction.parse() {
                config.sample.fraction = fraction;
            }
        }

        if let Ok(seed) = env::var("QA_RATER_SAMPLE_SEED") {
            if let Ok(seed) = seed.parse() {
                config.sample.seed = seed;
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RaterError::io(path, e))?;

        let file_config: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| RaterError::InvalidConfig(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(sources) = file_config.sources {
            if let Some(manual_file) = sources.manual_file {
                config.sources.manual_file = manual_file;
            }
            if let Some(model_file) = sources.model_file {
                config.sources.model_file = model_file;
            }
        }

        if let Some(sample) = file_config.sample {
            if let Some(fraction) = sample.fraction {
                config.sample.fraction = fraction;
            }
            if let Some(seed) = sample.seed {
                config.sample.seed = seed;
            }
        }

        if let Some(output) = file_config.output {
            if let Some(results_file) = output.results_file {
                config.output.results_file = results_file;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "qa-rater")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that the configuration can start a session.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample.fraction > 0.0 && self.sample.fraction <= 1.0) {
            return Err(RaterError::InvalidConfig(format!(
                "Sample fraction must be in (0, 1], got {}",
                self.sample.fraction
            )));
        }

        if self.sources.manual_file.as_os_str().is_empty() {
            return Err(RaterError::InvalidConfig(
                "Manual fact source path is required".to_string(),
            ));
        }

        if self.sources.model_file.as_os_str().is_empty() {
            return Err(RaterError::InvalidConfig(
                "Model fact source path is required".to_string(),
            ));
        }

        if self.output.results_file.as_os_str().is_empty() {
            return Err(RaterError::InvalidConfig(
                "Results file path is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Create a config from explicit source paths (useful for testing).
    pub fn with_sources(manual_file: impl Into<PathBuf>, model_file: impl Into<PathBuf>) -> Self {
        Self {
            sources: SourcesConfig {
                manual_file: manual_file.into(),
                model_file: model_file.into(),
            },
            ..Default::default()
        }
    }
}
