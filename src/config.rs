//! Pipeline configuration
//!
//! Loaded from a TOML file with `[etl]`, `[forecast]` and `[logging]`
//! sections. Every field is optional; missing ones take the defaults below.
//!
//! ```toml
//! [etl]
//! input = "data/data.csv"
//! warehouse = "warehouse"
//! table = "region_margin"
//! zero_cost = "null"
//!
//! [forecast]
//! fh = 3
//! session_id = 123
//! predict_horizon = 5
//! ```

use crate::error::{PipelineError, Result};
use margin_etl::{Partition, ZeroCostPolicy};
use margin_forecast::{Aggregation, ExperimentConfig, SortMetric};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings of the enrichment and trend stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Source CSV
    pub input: PathBuf,
    /// Directory holding the persisted tables
    pub warehouse: PathBuf,
    /// Name of the enriched table
    pub table: String,
    pub zero_cost: ZeroCostPolicy,
    /// Trend views to compute, each on its own
    pub partitions: Vec<Partition>,
    /// Also compute the region and product line views side by side
    pub combined_view: bool,
    /// Directory for trend CSV exports; no export when unset
    pub trends_dir: Option<PathBuf>,
    /// Rows printed per trend view
    pub preview_rows: usize,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/data.csv"),
            warehouse: PathBuf::from("warehouse"),
            table: "region_margin".to_string(),
            zero_cost: ZeroCostPolicy::default(),
            partitions: Partition::ALL.to_vec(),
            combined_view: true,
            trends_dir: None,
            preview_rows: 10,
        }
    }
}

/// Settings of the forecasting experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Forecast horizon used for the holdout and model comparison
    pub fh: usize,
    pub session_id: u64,
    pub folds: usize,
    pub sort_metric: SortMetric,
    pub coverage: f64,
    pub simulations: usize,
    pub aggregation: Aggregation,
    /// Horizon of the long-range forecast plot
    pub extended_horizon: usize,
    /// Horizon of the extra prediction call
    pub predict_horizon: usize,
    /// Directory for plot and prediction JSON files
    pub output_dir: PathBuf,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        let experiment = ExperimentConfig::default();
        Self {
            fh: experiment.fh,
            session_id: experiment.session_id,
            folds: experiment.folds,
            sort_metric: experiment.sort_metric,
            coverage: experiment.coverage,
            simulations: experiment.simulations,
            aggregation: Aggregation::default(),
            extended_horizon: 36,
            predict_horizon: 5,
            output_dir: PathBuf::from("reports"),
        }
    }
}

impl ForecastConfig {
    pub fn experiment(&self) -> ExperimentConfig {
        ExperimentConfig {
            fh: self.fh,
            session_id: self.session_id,
            folds: self.folds,
            sort_metric: self.sort_metric,
            coverage: self.coverage,
            simulations: self.simulations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when neither `RUST_LOG` nor `--log-level` is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub etl: EtlConfig,
    pub forecast: ForecastConfig,
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` when given, otherwise use the defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.etl.table.is_empty() {
            return Err(PipelineError::ConfigError(
                "etl.table must not be empty".to_string(),
            ));
        }
        if self.etl.partitions.is_empty() && !self.etl.combined_view {
            return Err(PipelineError::ConfigError(
                "etl.partitions is empty and the combined view is disabled".to_string(),
            ));
        }
        if self.forecast.extended_horizon == 0 || self.forecast.predict_horizon == 0 {
            return Err(PipelineError::ConfigError(
                "Forecast horizons must be positive".to_string(),
            ));
        }
        self.forecast.experiment().validate()?;
        Ok(())
    }
}
