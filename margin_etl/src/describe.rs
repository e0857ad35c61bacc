//! Summary statistics of a margin table

use crate::error::Result;
use crate::record::{COST, MARGIN, REVENUE};
use crate::table::{f64_column, MarginTable};
use chrono::NaiveDate;
use margin_math::stats;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Count, null count and moments of one numeric column.
///
/// Moments are taken over finite values only; `None` when there are none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub null_count: usize,
    pub non_finite_count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Overview of a margin table: dimensions, month range and numeric summaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableProfile {
    pub rows: usize,
    pub regions: Vec<String>,
    pub product_lines: Vec<String>,
    pub first_month: Option<NaiveDate>,
    pub last_month: Option<NaiveDate>,
    pub columns: Vec<ColumnSummary>,
}

impl MarginTable {
    /// Summaries of the numeric columns (cost, revenue, margin)
    pub fn describe(&self) -> Result<Vec<ColumnSummary>> {
        [COST, REVENUE, MARGIN]
            .iter()
            .map(|name| summarize_column(name, &f64_column(self.dataframe(), name)?))
            .collect()
    }

    /// Dimensions and summaries of the whole table
    pub fn profile(&self) -> Result<TableProfile> {
        let records = self.records()?;

        let regions: BTreeSet<&str> = records.iter().map(|r| r.region.as_str()).collect();
        let product_lines: BTreeSet<&str> =
            records.iter().map(|r| r.product_line.as_str()).collect();

        Ok(TableProfile {
            rows: records.len(),
            regions: regions.into_iter().map(str::to_string).collect(),
            product_lines: product_lines.into_iter().map(str::to_string).collect(),
            first_month: records.iter().map(|r| r.month).min(),
            last_month: records.iter().map(|r| r.month).max(),
            columns: self.describe()?,
        })
    }
}

fn summarize_column(name: &str, values: &[Option<f64>]) -> Result<ColumnSummary> {
    let finite: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    let present = values.iter().filter(|v| v.is_some()).count();

    let (min, max) = if finite.is_empty() {
        (None, None)
    } else {
        let (lo, hi) = stats::min_max(&finite)?;
        (Some(lo), Some(hi))
    };

    Ok(ColumnSummary {
        column: name.to_string(),
        count: values.len(),
        null_count: values.len() - present,
        non_finite_count: present - finite.len(),
        mean: stats::mean(&finite).ok(),
        std_dev: stats::std_dev(&finite).ok(),
        min,
        max,
    })
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

impl fmt::Display for TableProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Margin Table Profile:")?;
        writeln!(f, "  Rows:          {}", self.rows)?;
        writeln!(f, "  Regions:       {}", self.regions.join(", "))?;
        writeln!(f, "  Product lines: {}", self.product_lines.join(", "))?;
        if let (Some(first), Some(last)) = (self.first_month, self.last_month) {
            writeln!(f, "  Months:        {} .. {}", first, last)?;
        }
        writeln!(
            f,
            "  {:<15} {:>6} {:>6} {:>10} {:>10} {:>10} {:>10}",
            "column", "count", "nulls", "mean", "std", "min", "max"
        )?;
        for c in &self.columns {
            writeln!(
                f,
                "  {:<15} {:>6} {:>6} {:>10} {:>10} {:>10} {:>10}",
                c.column,
                c.count,
                c.null_count,
                fmt_opt(c.mean),
                fmt_opt(c.std_dev),
                fmt_opt(c.min),
                fmt_opt(c.max)
            )?;
        }
        Ok(())
    }
}
