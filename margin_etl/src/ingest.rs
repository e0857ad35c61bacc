//! Source CSV loading

use crate::error::{EtlError, Result};
use crate::record::{
    days_since_epoch, RawMarginRow, COST, MONTH, PRODUCT_LINE, REGION, REVENUE, SOURCE_COLUMNS,
};
use polars::prelude::*;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Loader for the regional product-line CSV export
#[derive(Debug)]
pub struct CsvSource;

impl CsvSource {
    /// Load rows from a CSV file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawMarginRow>> {
        let path = path.as_ref();
        let reader = Self::builder().from_path(path)?;
        let rows = Self::read_rows(reader)?;

        info!(path = %path.display(), rows = rows.len(), "Loaded margin source CSV");
        Ok(rows)
    }

    /// Load rows from any reader (for example an in-memory buffer)
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RawMarginRow>> {
        Self::read_rows(Self::builder().from_reader(reader))
    }

    fn builder() -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(true)
            .delimiter(b',')
            .trim(csv::Trim::All);
        builder
    }

    fn read_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<RawMarginRow>> {
        let headers = reader.headers()?.clone();
        let missing: Vec<&str> = SOURCE_COLUMNS
            .iter()
            .map(|(source, _)| *source)
            .filter(|source| !headers.iter().any(|h| h == *source))
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::MissingColumn(missing.join(", ")));
        }

        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: RawMarginRow = record?;
            rows.push(row);
        }

        debug!(rows = rows.len(), "Deserialized source rows");
        Ok(rows)
    }
}

/// Build a dataframe with canonical column names from source rows.
///
/// `month` is stored as a polars `Date`.
pub fn raw_frame(rows: &[RawMarginRow]) -> Result<DataFrame> {
    let regions: Vec<String> = rows.iter().map(|r| r.region.clone()).collect();
    let product_lines: Vec<String> = rows.iter().map(|r| r.product_line.clone()).collect();
    let months: Vec<i32> = rows.iter().map(|r| days_since_epoch(r.month)).collect();
    let costs: Vec<Option<f64>> = rows.iter().map(|r| r.cost_m_usd).collect();
    let revenues: Vec<Option<f64>> = rows.iter().map(|r| r.revenue_m_usd).collect();

    let df = df!(
        REGION => regions,
        PRODUCT_LINE => product_lines,
        MONTH => months,
        COST => costs,
        REVENUE => revenues
    )?;

    Ok(df
        .lazy()
        .with_column(col(MONTH).cast(DataType::Date))
        .collect()?)
}
