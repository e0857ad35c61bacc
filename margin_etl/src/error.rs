//! Error types for the margin_etl crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while loading, enriching, windowing or storing margin data
#[derive(Debug, Error)]
pub enum EtlError {
    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error while reading or decoding the source CSV
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// A required column is absent from the input or the stored table
    #[error("Missing column(s): {0}")]
    MissingColumn(String),

    /// A month value that none of the accepted formats could parse
    #[error("Invalid month: '{0}'")]
    InvalidMonth(String),

    /// Zero-cost rows rejected by the configured policy
    #[error("{count} row(s) have zero cost, first at data row {first_row}")]
    ZeroCost { count: usize, first_row: usize },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid table name: '{0}'")]
    InvalidTableName(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Math error: {0}")]
    MathError(#[from] margin_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, EtlError>;

impl From<PolarsError> for EtlError {
    fn from(err: PolarsError) -> Self {
        EtlError::PolarsError(err.to_string())
    }
}
