//! Parquet-backed table storage
//!
//! A table is a directory under the warehouse root holding one or more
//! parquet part files. Writes replace the whole table: the directory is
//! removed first and then written again, so a failure in between leaves no
//! table behind.

use crate::error::{EtlError, Result};
use crate::table::MarginTable;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PART_FILE: &str = "part-00000.parquet";

/// Directory of named parquet tables
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing a table
    pub fn table_dir(&self, name: &str) -> Result<PathBuf> {
        validate_table_name(name)?;
        Ok(self.root.join(name))
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.table_dir(name)?.is_dir())
    }

    /// Remove a table; returns whether it existed
    pub fn drop_table(&self, name: &str) -> Result<bool> {
        let dir = self.table_dir(name)?;
        if !dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir)?;
        info!(table = name, "Dropped table");
        Ok(true)
    }

    /// Replace a table with the given contents (drop, then write)
    pub fn overwrite(&self, name: &str, table: &MarginTable) -> Result<PathBuf> {
        self.drop_table(name)?;

        let dir = self.table_dir(name)?;
        fs::create_dir_all(&dir)?;

        let path = dir.join(PART_FILE);
        let mut file = File::create(&path)?;
        let mut df = table.dataframe().clone();
        ParquetWriter::new(&mut file).finish(&mut df)?;

        info!(table = name, rows = df.height(), path = %path.display(), "Wrote table");
        Ok(path)
    }

    /// Read a table back, concatenating its part files in name order
    pub fn read(&self, name: &str) -> Result<MarginTable> {
        let dir = self.table_dir(name)?;
        if !dir.is_dir() {
            return Err(EtlError::TableNotFound(name.to_string()));
        }

        let mut parts: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "parquet"))
            .collect();
        parts.sort();

        let mut combined: Option<DataFrame> = None;
        for part in &parts {
            let df = ParquetReader::new(File::open(part)?).finish()?;
            debug!(part = %part.display(), rows = df.height(), "Read table part");
            combined = Some(match combined {
                None => df,
                Some(mut acc) => {
                    acc.vstack_mut(&df)?;
                    acc
                }
            });
        }

        let df = combined.ok_or_else(|| EtlError::TableNotFound(name.to_string()))?;
        MarginTable::from_dataframe(df)
    }

    /// Names of the tables currently in the warehouse
    pub fn list_tables(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| validate_table_name(name).is_ok())
            .collect();
        names.sort();
        Ok(names)
    }
}

fn validate_table_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(EtlError::InvalidTableName(name.to_string()))
    }
}
