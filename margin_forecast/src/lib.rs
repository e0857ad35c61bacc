//! # Margin Forecast
//!
//! Forecasting experiment over the monthly margin series of a persisted
//! margin table.
//!
//! ## Features
//!
//! - Monthly series construction with duplicate-month aggregation and
//!   contiguity checks
//! - Candidate models: naive, grand mean, seasonal naive, drift, linear trend,
//!   simple moving average, and exponential smoothing (simple, Holt and
//!   automatic ETS) fitted by augurs
//! - Expanding-window cross-validation and a ranked leaderboard
//! - Holdout and future predictions with seeded bootstrap intervals
//! - Forecast and residual plot data as JSON
//!
//! ## Quick Start
//!
//! ```no_run
//! use margin_etl::TableStore;
//! use margin_forecast::{Aggregation, Experiment, ExperimentConfig, MonthlySeries};
//!
//! # fn main() -> margin_forecast::Result<()> {
//! let table = TableStore::new("warehouse").read("region_margin")?;
//! let series = MonthlySeries::from_table(&table, Aggregation::Mean)?;
//!
//! let experiment = Experiment::setup(series, ExperimentConfig::default())?;
//! let board = experiment.compare_models()?;
//! println!("{}", board);
//!
//! let best = experiment.select_best(&board)?;
//! println!("{}", experiment.predict_holdout(&best)?);
//!
//! let final_model = experiment.finalize(&best)?;
//! let next_five = experiment.predict(&final_model, 5)?;
//! println!("{:?}", next_five.values());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod experiment;
pub mod intervals;
pub mod models;
pub mod plots;
pub mod series;

// Re-export commonly used types
pub use crate::error::{ForecastError, Result};
pub use crate::experiment::{
    Experiment, ExperimentConfig, FittedModel, HoldoutPrediction, Leaderboard, LeaderboardEntry,
    SeriesStats, SortMetric,
};
pub use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
pub use crate::plots::{ForecastPlot, ResidualPlot};
pub use crate::series::{Aggregation, MonthlySeries};
