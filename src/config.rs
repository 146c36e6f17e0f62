//! Configuration management for the fraud scoring service

use crate::types::verdict::{DEFAULT_FRAUD_THRESHOLD, OUTLIER_SENTINEL};
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which scoring path the prediction endpoint runs
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Scaled features through the classifier only
    #[default]
    Classifier,
    /// Classifier verdict and anomaly flag reported side by side
    Combined,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub detection: DetectionConfig,
    pub dataset: DatasetConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds between metrics summaries in the log (0 disables)
    pub metrics_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            metrics_interval_secs: 60,
        }
    }
}

/// Trained artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory containing the artifact files
    pub models_dir: String,
    /// ONNX classifier file name
    pub classifier_file: String,
    /// Fitted scaler parameters (JSON)
    pub scaler_file: String,
    /// ONNX anomaly detector file name
    pub anomaly_file: String,
    /// Scoring path used by the prediction endpoint
    pub mode: ScoringMode,
    /// Number of threads for ONNX inference per model
    pub onnx_threads: usize,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            classifier_file: "classifier.onnx".to_string(),
            scaler_file: "scaler.json".to_string(),
            anomaly_file: "anomaly_detector.onnx".to_string(),
            mode: ScoringMode::Classifier,
            onnx_threads: 1,
        }
    }
}

impl ModelsConfig {
    pub fn classifier_path(&self) -> PathBuf {
        Path::new(&self.models_dir).join(&self.classifier_file)
    }

    pub fn scaler_path(&self) -> PathBuf {
        Path::new(&self.models_dir).join(&self.scaler_file)
    }

    pub fn anomaly_path(&self) -> PathBuf {
        Path::new(&self.models_dir).join(&self.anomaly_file)
    }
}

/// Decision constants
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Probability above which the label is fraud
    pub fraud_threshold: f64,
    /// Anomaly detector output that marks an outlier
    pub anomaly_sentinel: i64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fraud_threshold: DEFAULT_FRAUD_THRESHOLD,
            anomaly_sentinel: OUTLIER_SENTINEL,
        }
    }
}

/// Historical table used by the monitoring view
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: String,
    /// Bins in the fraud amount histogram
    pub amount_bins: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: "data/raw/cleaned_creditcard.csv".to_string(),
            amount_bins: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file plus environment
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// The file is optional. `FRAUD_GUARD__<SECTION>__<KEY>` variables
    /// override it, e.g. `FRAUD_GUARD__SERVER__PORT=9000`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("FRAUD_GUARD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.detection.fraud_threshold;
        ensure!(
            (0.0..=1.0).contains(&threshold),
            "detection.fraud_threshold must be within [0, 1], got {}",
            threshold
        );
        ensure!(self.models.onnx_threads > 0, "models.onnx_threads must be at least 1");
        ensure!(self.dataset.amount_bins > 0, "dataset.amount_bins must be at least 1");
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
