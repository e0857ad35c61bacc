//! Month-over-month margin trend views
//!
//! Each view orders rows by month within a partition and attaches the
//! previous row's margin (`lag`) and the difference to it (`mom`). The first
//! row of every partition has no predecessor, so both columns are null there.
//! Rows sharing a month inside a partition keep their table order.

use crate::error::{EtlError, Result};
use crate::record::{MarginRecord, MARGIN, MONTH, PRODUCT_LINE, REGION};
use crate::table::{f64_column, records_from_frame, MarginTable};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Grouping key for a trend view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// The whole table as one partition
    Global,
    Region,
    ProductLine,
    RegionProductLine,
}

impl Partition {
    /// Every partition, in dashboard order
    pub const ALL: [Partition; 4] = [
        Partition::Global,
        Partition::Region,
        Partition::ProductLine,
        Partition::RegionProductLine,
    ];

    /// Columns the window is partitioned by
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Partition::Global => &[],
            Partition::Region => &[REGION],
            Partition::ProductLine => &[PRODUCT_LINE],
            Partition::RegionProductLine => &[REGION, PRODUCT_LINE],
        }
    }

    fn column_prefix(&self) -> &'static str {
        match self {
            Partition::Global => "",
            Partition::Region => "region_month_",
            Partition::ProductLine => "product_line_month_",
            Partition::RegionProductLine => "region_product_line_month_",
        }
    }

    /// Name of the previous-period margin column
    pub fn lag_column(&self) -> String {
        format!("{}margin_mom_lag", self.column_prefix())
    }

    /// Name of the month-over-month change column
    pub fn delta_column(&self) -> String {
        format!("{}margin_mom", self.column_prefix())
    }

    fn lag_expr(&self) -> Expr {
        let lag = col(MARGIN).shift(lit(1));
        match self.keys() {
            [] => lag,
            keys => lag.over(keys.iter().map(|k| col(*k)).collect::<Vec<_>>()),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Partition::Global => "global",
            Partition::Region => "region",
            Partition::ProductLine => "product_line",
            Partition::RegionProductLine => "region_product_line",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Partition {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "global" | "none" => Ok(Partition::Global),
            "region" => Ok(Partition::Region),
            "product_line" => Ok(Partition::ProductLine),
            "region_product_line" => Ok(Partition::RegionProductLine),
            other => Err(EtlError::DataError(format!("Unknown partition '{}'", other))),
        }
    }
}

/// Lag and change of one partition for one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MomChange {
    pub partition: Partition,
    /// Margin of the previous row in the partition
    pub lag: Option<f64>,
    /// `margin - lag`
    pub delta: Option<f64>,
}

/// A margin record extended with month-over-month changes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRecord {
    pub record: MarginRecord,
    pub changes: Vec<MomChange>,
}

impl TrendRecord {
    /// Change for a given partition, if the view computed it
    pub fn change(&self, partition: Partition) -> Option<&MomChange> {
        self.changes.iter().find(|c| c.partition == partition)
    }
}

/// Materialized trend view, for display or export
#[derive(Debug, Clone)]
pub struct TrendView {
    partitions: Vec<Partition>,
    df: DataFrame,
}

impl TrendView {
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
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

    /// Materialize every row, in view order
    pub fn records(&self) -> Result<Vec<TrendRecord>> {
        let records = records_from_frame(&self.df)?;

        let mut columns = Vec::with_capacity(self.partitions.len());
        for partition in &self.partitions {
            columns.push((
                *partition,
                f64_column(&self.df, &partition.lag_column())?,
                f64_column(&self.df, &partition.delta_column())?,
            ));
        }

        Ok(records
            .into_iter()
            .enumerate()
            .map(|(i, record)| TrendRecord {
                record,
                changes: columns
                    .iter()
                    .map(|(partition, lags, deltas)| MomChange {
                        partition: *partition,
                        lag: lags[i],
                        delta: deltas[i],
                    })
                    .collect(),
            })
            .collect())
    }

    /// Write the view as CSV, header included
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path)?;
        let mut df = self.df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;

        info!(path = %path.display(), rows = df.height(), "Exported trend view");
        Ok(())
    }
}

impl fmt::Display for TrendView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.df)
    }
}

/// Sort that keeps the incoming order of rows with equal keys
fn sort_stable(lf: LazyFrame, by: Vec<Expr>) -> LazyFrame {
    lf.sort_by_exprs(by, SortMultipleOptions::default().with_maintain_order(true))
}

/// Compute the trend view for a single partition.
///
/// Rows come out grouped by the partition keys, then by month.
pub fn compute_trend(table: &MarginTable, partition: Partition) -> Result<TrendView> {
    compute_trends(table, &[partition])
}

/// Compute several partitions' lag and change columns side by side.
///
/// With a single non-global partition the rows are grouped by its keys;
/// otherwise they are ordered by month only.
pub fn compute_trends(table: &MarginTable, partitions: &[Partition]) -> Result<TrendView> {
    let mut unique: Vec<Partition> = Vec::with_capacity(partitions.len());
    for partition in partitions {
        if !unique.contains(partition) {
            unique.push(*partition);
        }
    }
    if unique.is_empty() {
        return Err(EtlError::DataError(
            "A trend view needs at least one partition".to_string(),
        ));
    }

    let mut lf = sort_stable(table.dataframe().clone().lazy(), vec![col(MONTH)]);
    for partition in &unique {
        let lag_column = partition.lag_column();
        lf = lf
            .with_column(partition.lag_expr().alias(lag_column.as_str()))
            .with_column(
                (col(MARGIN) - col(lag_column.as_str())).alias(partition.delta_column().as_str()),
            );
    }

    if let [single] = unique.as_slice() {
        if !single.keys().is_empty() {
            let mut by: Vec<Expr> = single.keys().iter().map(|k| col(*k)).collect();
            by.push(col(MONTH));
            lf = sort_stable(lf, by);
        }
    }

    let df = lf.collect()?;
    debug!(partitions = ?unique, rows = df.height(), "Computed trend view");

    Ok(TrendView {
        partitions: unique,
        df,
    })
}
