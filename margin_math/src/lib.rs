//! # Margin Math
//!
//! Numeric building blocks shared by the margin pipeline and the forecasting
//! experiment. Everything here works on plain `f64` slices so it can be used
//! on dataframe columns and forecast vectors alike.

use thiserror::Error;

pub mod accuracy;
pub mod regression;
pub mod stats;

pub use accuracy::{forecast_accuracy, AccuracyMetrics};
pub use stats::{ljung_box, LjungBox};

/// Errors that can occur in numeric calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
