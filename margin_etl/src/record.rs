//! Record types and column names

use crate::error::{EtlError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

pub const REGION: &str = "region";
pub const PRODUCT_LINE: &str = "product_line";
pub const MONTH: &str = "month";
pub const COST: &str = "cost_m_usd";
pub const REVENUE: &str = "revenue_m_usd";
pub const MARGIN: &str = "margin";

/// Canonical column order of an enriched margin table
pub const MARGIN_COLUMNS: [&str; 6] = [REGION, PRODUCT_LINE, MONTH, COST, REVENUE, MARGIN];

/// Source CSV headers, paired with the canonical name each is renamed to.
///
/// `Revevue (M$)` is misspelled in the data files this pipeline consumes and
/// has to stay that way.
pub const SOURCE_COLUMNS: [(&str, &str); 5] = [
    ("Region", REGION),
    ("Product Line", PRODUCT_LINE),
    ("Month", MONTH),
    ("Cost (M$)", COST),
    ("Revevue (M$)", REVENUE),
];

/// Days between 0001-01-01 (CE day 1) and the Unix epoch
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A row of the source CSV, already under canonical names.
///
/// Empty cost or revenue fields are read as `None` and carried through as
/// nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMarginRow {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Product Line")]
    pub product_line: String,
    #[serde(rename = "Month", deserialize_with = "deserialize_month")]
    pub month: NaiveDate,
    #[serde(rename = "Cost (M$)")]
    pub cost_m_usd: Option<f64>,
    #[serde(rename = "Revevue (M$)")]
    pub revenue_m_usd: Option<f64>,
}

/// An enriched row: the source values plus the derived margin.
///
/// `margin` is `None` when cost or revenue is missing, or when the zero-cost
/// policy nulls it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginRecord {
    pub region: String,
    pub product_line: String,
    pub month: NaiveDate,
    pub cost_m_usd: Option<f64>,
    pub revenue_m_usd: Option<f64>,
    pub margin: Option<f64>,
}

impl MarginRecord {
    /// Build a record from raw values, computing `(revenue - cost) / cost`
    pub fn new(
        region: impl Into<String>,
        product_line: impl Into<String>,
        month: NaiveDate,
        cost_m_usd: f64,
        revenue_m_usd: f64,
    ) -> Self {
        Self {
            region: region.into(),
            product_line: product_line.into(),
            month,
            cost_m_usd: Some(cost_m_usd),
            revenue_m_usd: Some(revenue_m_usd),
            margin: Some(margin_ratio(revenue_m_usd, cost_m_usd)),
        }
    }
}

/// (Revenue - Cost) / Cost
pub fn margin_ratio(revenue: f64, cost: f64) -> f64 {
    (revenue - cost) / cost
}

/// Parse a month value and truncate it to the first day of its month.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM`, `YYYY/MM/DD`, `MM/DD/YYYY` and timestamps
/// whose date part is one of those.
pub fn parse_month(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);

    let parsed = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", date_part), "%Y-%m-%d").ok())
        .ok_or_else(|| EtlError::InvalidMonth(raw.to_string()))?;

    first_of_month(parsed)
}

/// Truncate a date to the first day of its month
pub fn first_of_month(date: NaiveDate) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .ok_or_else(|| EtlError::InvalidMonth(date.to_string()))
}

/// Physical value of a polars `Date`
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

/// Inverse of [`days_since_epoch`]
pub fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

fn deserialize_month<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_month(&raw).map_err(serde::de::Error::custom)
}
