//! Monthly margin series used as forecast input

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate};
use margin_etl::record::{date_from_days, MARGIN, MONTH, PRODUCT_LINE, REGION};
use margin_etl::MarginTable;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// How rows sharing a month are collapsed into one observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Average of the month's margins
    #[default]
    Mean,
    /// Sum of the month's margins
    Sum,
    /// Refuse duplicate months
    Strict,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
            Aggregation::Strict => "strict",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Aggregation {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Aggregation::Mean),
            "sum" => Ok(Aggregation::Sum),
            "strict" => Ok(Aggregation::Strict),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown aggregation '{}'",
                other
            ))),
        }
    }
}

/// Ordered `(month, margin)` observations, one per calendar month with no gaps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySeries {
    months: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl MonthlySeries {
    /// Create a series, checking that months are first-of-month and contiguous
    pub fn new(months: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if months.len() != values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Months length ({}) doesn't match values length ({})",
                months.len(),
                values.len()
            )));
        }
        if months.is_empty() {
            return Err(ForecastError::DataError("Empty monthly series".to_string()));
        }
        if let Some(month) = months.iter().find(|m| m.day() != 1) {
            return Err(ForecastError::DataError(format!(
                "Month {} is not the first day of a month",
                month
            )));
        }
        for pair in months.windows(2) {
            if next_month(pair[0])? != pair[1] {
                return Err(ForecastError::DataError(format!(
                    "Months are not contiguous: {} is followed by {}",
                    pair[0], pair[1]
                )));
            }
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "Non-finite value for {}",
                months[i]
            )));
        }

        Ok(Self { months, values })
    }

    /// Build the forecast input from an enriched table.
    ///
    /// The table is projected to `(margin, product_line, region, month)` and
    /// then narrowed to `(month, margin)`. Null and non-finite margins are
    /// skipped; months with several rows are collapsed per `aggregation`.
    pub fn from_table(table: &MarginTable, aggregation: Aggregation) -> Result<Self> {
        let projected = table.project(&[MARGIN, PRODUCT_LINE, REGION, MONTH])?;
        let narrowed = projected.select([MONTH, MARGIN])?;

        let days = narrowed
            .column(MONTH)?
            .as_materialized_series()
            .cast(&DataType::Int32)?;
        let margins = narrowed
            .column(MARGIN)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;

        let mut by_month: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        let mut skipped = 0usize;
        for (day, margin) in days.i32()?.into_iter().zip(margins.f64()?.into_iter()) {
            let month = day.and_then(date_from_days).ok_or_else(|| {
                ForecastError::DataError("Null or invalid month in margin table".to_string())
            })?;
            match margin {
                Some(value) if value.is_finite() => by_month.entry(month).or_default().push(value),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "Skipped rows without a finite margin");
        }

        let mut months = Vec::with_capacity(by_month.len());
        let mut values = Vec::with_capacity(by_month.len());
        for (month, observations) in by_month {
            let value = match aggregation {
                Aggregation::Mean => observations.iter().sum::<f64>() / observations.len() as f64,
                Aggregation::Sum => observations.iter().sum(),
                Aggregation::Strict => match observations.as_slice() {
                    [single] => *single,
                    _ => {
                        return Err(ForecastError::DataError(format!(
                            "{} rows share month {}",
                            observations.len(),
                            month
                        )))
                    }
                },
            };
            months.push(month);
            values.push(value);
        }

        debug!(
            rows = table.len(),
            months = months.len(),
            aggregation = %aggregation,
            "Built monthly series"
        );
        Self::new(months, values)
    }

    pub fn months(&self) -> &[NaiveDate] {
        &self.months
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_month(&self) -> NaiveDate {
        self.months[0]
    }

    pub fn last_month(&self) -> NaiveDate {
        self.months[self.months.len() - 1]
    }

    /// The `horizon` months following the last observation
    pub fn future_months(&self, horizon: usize) -> Result<Vec<NaiveDate>> {
        let mut months = Vec::with_capacity(horizon);
        let mut current = self.last_month();
        for _ in 0..horizon {
            current = next_month(current)?;
            months.push(current);
        }
        Ok(months)
    }

    /// Split off the last `test_len` observations
    pub fn train_test_split(&self, test_len: usize) -> Result<(MonthlySeries, MonthlySeries)> {
        if test_len == 0 || test_len >= self.len() {
            return Err(ForecastError::InsufficientData(format!(
                "Cannot hold out {} of {} observations",
                test_len,
                self.len()
            )));
        }

        let cut = self.len() - test_len;
        Ok((self.slice(0, cut), self.slice(cut, self.len())))
    }

    fn slice(&self, start: usize, end: usize) -> MonthlySeries {
        MonthlySeries {
            months: self.months[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        }
    }
}

impl fmt::Display for MonthlySeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<12} {:>10}", "month", "margin")?;
        for (month, value) in self.months.iter().zip(&self.values) {
            writeln!(f, "{:<12} {:>10.4}", month, value)?;
        }
        Ok(())
    }
}

/// First day of the following month
pub fn next_month(month: NaiveDate) -> Result<NaiveDate> {
    month
        .checked_add_months(Months::new(1))
        .ok_or_else(|| ForecastError::DataError(format!("No month after {}", month)))
}
