//! The enriched margin table

use crate::error::{EtlError, Result};
use crate::record::{
    date_from_days, days_since_epoch, MarginRecord, COST, MARGIN, MARGIN_COLUMNS, MONTH,
    PRODUCT_LINE, REGION, REVENUE,
};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fmt;

/// Dataframe holding Margin Records under the canonical schema
#[derive(Debug, Clone)]
pub struct MarginTable {
    df: DataFrame,
}

impl MarginTable {
    /// Wrap a dataframe, checking that every canonical column is present.
    ///
    /// Extra columns are dropped and the remaining ones put in canonical order.
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        let missing: Vec<&str> = MARGIN_COLUMNS
            .iter()
            .copied()
            .filter(|name| df.column(name).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::MissingColumn(missing.join(", ")));
        }

        Ok(Self {
            df: df.select(MARGIN_COLUMNS)?,
        })
    }

    /// Build a table from already computed records
    pub fn from_records(records: &[MarginRecord]) -> Result<Self> {
        let regions: Vec<String> = records.iter().map(|r| r.region.clone()).collect();
        let product_lines: Vec<String> = records.iter().map(|r| r.product_line.clone()).collect();
        let months: Vec<i32> = records.iter().map(|r| days_since_epoch(r.month)).collect();
        let costs: Vec<Option<f64>> = records.iter().map(|r| r.cost_m_usd).collect();
        let revenues: Vec<Option<f64>> = records.iter().map(|r| r.revenue_m_usd).collect();
        let margins: Vec<Option<f64>> = records.iter().map(|r| r.margin).collect();

        let df = df!(
            REGION => regions,
            PRODUCT_LINE => product_lines,
            MONTH => months,
            COST => costs,
            REVENUE => revenues,
            MARGIN => margins
        )?;

        let df = df
            .lazy()
            .with_column(col(MONTH).cast(DataType::Date))
            .collect()?;

        Self::from_dataframe(df)
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Select a subset of columns, in the given order
    pub fn project(&self, columns: &[&str]) -> Result<DataFrame> {
        Ok(self.df.select(columns.iter().copied())?)
    }

    /// Materialize every row as a [`MarginRecord`], in table order
    pub fn records(&self) -> Result<Vec<MarginRecord>> {
        records_from_frame(&self.df)
    }

    /// Margin column values, in table order
    pub fn margins(&self) -> Result<Vec<Option<f64>>> {
        f64_column(&self.df, MARGIN)
    }

    /// Month column values, in table order
    pub fn months(&self) -> Result<Vec<NaiveDate>> {
        month_column(&self.df, MONTH)
    }
}

impl fmt::Display for MarginTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.df)
    }
}

pub(crate) fn records_from_frame(df: &DataFrame) -> Result<Vec<MarginRecord>> {
    let regions = str_column(df, REGION)?;
    let product_lines = str_column(df, PRODUCT_LINE)?;
    let months = month_column(df, MONTH)?;
    let costs = f64_column(df, COST)?;
    let revenues = f64_column(df, REVENUE)?;
    let margins = f64_column(df, MARGIN)?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        records.push(MarginRecord {
            region: regions[i].clone(),
            product_line: product_lines[i].clone(),
            month: months[i],
            cost_m_usd: costs[i],
            revenue_m_usd: revenues[i],
            margin: margins[i],
        });
    }

    Ok(records)
}

pub(crate) fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let values: Vec<Option<f64>> = series.f64()?.into_iter().collect();
    Ok(values)
}

pub(crate) fn str_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    df.column(name)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .map(str::to_string)
                .ok_or_else(|| EtlError::DataError(format!("Null {} at row {}", name, i)))
        })
        .collect()
}

pub(crate) fn month_column(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let days = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Int32)?;

    let months = days
        .i32()?
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .and_then(date_from_days)
                .ok_or_else(|| EtlError::DataError(format!("Invalid {} at row {}", name, i)))
        })
        .collect::<Result<Vec<_>>>();
    months
}
