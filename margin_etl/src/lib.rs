//! # Margin ETL
//!
//! Batch preparation of regional product-line margin data.
//!
//! ## Features
//!
//! - CSV ingestion with the source headers mapped to canonical column names
//! - Margin enrichment: `margin = (revenue - cost) / cost`, with a configurable
//!   policy for zero-cost rows
//! - Month-over-month trend views over four partitions (global, region,
//!   product line, region × product line)
//! - Parquet table storage with drop-then-write overwrite semantics
//! - Table profiles (row counts, month range, numeric summaries)
//!
//! ## Quick Start
//!
//! ```no_run
//! use margin_etl::{compute_trend, enrich, CsvSource, Partition, TableStore, ZeroCostPolicy};
//!
//! # fn main() -> margin_etl::Result<()> {
//! let rows = CsvSource::from_path("data/data.csv")?;
//! let table = enrich(&rows, ZeroCostPolicy::Null)?;
//!
//! let by_region = compute_trend(&table, Partition::Region)?;
//! println!("{}", by_region);
//!
//! TableStore::new("warehouse").overwrite("region_margin", &table)?;
//! # Ok(())
//! # }
//! ```

pub mod describe;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod record;
pub mod store;
pub mod table;
pub mod trend;

// Re-export commonly used types
pub use crate::describe::{ColumnSummary, TableProfile};
pub use crate::enrich::{enrich, ZeroCostPolicy};
pub use crate::error::{EtlError, Result};
pub use crate::ingest::CsvSource;
pub use crate::record::{MarginRecord, RawMarginRow};
pub use crate::store::TableStore;
pub use crate::table::MarginTable;
pub use crate::trend::{compute_trend, compute_trends, MomChange, Partition, TrendRecord, TrendView};
