//! Margin enrichment

use crate::error::{EtlError, Result};
use crate::ingest::raw_frame;
use crate::record::{RawMarginRow, COST, MARGIN, REVENUE};
use crate::table::MarginTable;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// What to do with rows whose cost is zero, where the margin ratio is undefined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroCostPolicy {
    /// Store a null margin
    #[default]
    Null,
    /// Keep the IEEE result of the division (infinity or NaN)
    Propagate,
    /// Fail the enrichment
    Reject,
}

impl fmt::Display for ZeroCostPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZeroCostPolicy::Null => "null",
            ZeroCostPolicy::Propagate => "propagate",
            ZeroCostPolicy::Reject => "reject",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ZeroCostPolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "null" => Ok(ZeroCostPolicy::Null),
            "propagate" => Ok(ZeroCostPolicy::Propagate),
            "reject" => Ok(ZeroCostPolicy::Reject),
            other => Err(EtlError::DataError(format!(
                "Unknown zero cost policy '{}'",
                other
            ))),
        }
    }
}

/// Expression computing `(revenue - cost) / cost` under the given policy
pub fn margin_expr(policy: ZeroCostPolicy) -> Expr {
    let ratio = (col(REVENUE) - col(COST)) / col(COST);

    match policy {
        ZeroCostPolicy::Null => when(col(COST).eq(lit(0.0)))
            .then(lit(NULL))
            .otherwise(ratio),
        ZeroCostPolicy::Propagate | ZeroCostPolicy::Reject => ratio,
    }
}

/// Enrich source rows with the margin column.
///
/// Rows are kept in source order; no other validation is applied to costs or
/// revenues. A missing cost or revenue yields a null margin.
pub fn enrich(rows: &[RawMarginRow], policy: ZeroCostPolicy) -> Result<MarginTable> {
    let zero_cost_rows: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.cost_m_usd == Some(0.0))
        .map(|(i, _)| i + 1)
        .collect();

    if let Some(&first_row) = zero_cost_rows.first() {
        match policy {
            ZeroCostPolicy::Reject => {
                return Err(EtlError::ZeroCost {
                    count: zero_cost_rows.len(),
                    first_row,
                })
            }
            ZeroCostPolicy::Null => warn!(
                count = zero_cost_rows.len(),
                first_row, "Zero-cost rows get a null margin"
            ),
            ZeroCostPolicy::Propagate => warn!(
                count = zero_cost_rows.len(),
                first_row, "Zero-cost rows produce non-finite margins"
            ),
        }
    }

    let incomplete = rows
        .iter()
        .filter(|row| row.cost_m_usd.is_none() || row.revenue_m_usd.is_none())
        .count();
    if incomplete > 0 {
        warn!(count = incomplete, "Rows with a missing cost or revenue get a null margin");
    }

    let df = raw_frame(rows)?
        .lazy()
        .with_column(margin_expr(policy).alias(MARGIN))
        .collect()?;

    let table = MarginTable::from_dataframe(df)?;
    info!(rows = table.len(), policy = %policy, "Computed margins");
    Ok(table)
}
