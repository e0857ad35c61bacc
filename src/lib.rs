//! # Region Margin
//!
//! Batch pipeline over regional product-line revenue and cost data.
//!
//! The workspace is split into:
//!
//! - [`margin_math`]: statistics, accuracy metrics and least squares
//! - [`margin_etl`]: CSV ingestion, margin enrichment, trend views, table store
//! - [`margin_forecast`]: monthly series, models and the forecasting experiment
//!
//! This crate wires them together behind a TOML configuration and the
//! `region-margin` command line tool.
//!
//! ## Example
//!
//! ```no_run
//! use region_margin_workspace::config::PipelineConfig;
//! use region_margin_workspace::pipeline::{run_enrichment, run_forecast, run_trends};
//!
//! # fn main() -> region_margin_workspace::Result<()> {
//! let config = PipelineConfig::default();
//!
//! let summary = run_enrichment(&config.etl)?;
//! println!("{}", summary.profile);
//!
//! for output in run_trends(&config.etl)? {
//!     println!("{}", output.view);
//! }
//!
//! let report = run_forecast(&config.etl, &config.forecast)?;
//! println!("{}", report.leaderboard);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;

pub use crate::config::PipelineConfig;
pub use crate::error::{PipelineError, Result};

pub use margin_etl;
pub use margin_forecast;
pub use margin_math;
