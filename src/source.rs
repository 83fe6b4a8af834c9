// src/source.rs

//! Data sources feeding the fetch stages.

use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::FetchError;
use crate::table::Table;

/// Anything that can produce a raw table on demand.
pub trait TableSource: Send + Sync + Debug {
    fn name(&self) -> &str;
    fn fetch(&self) -> Result<Table, FetchError>;
}

/// A local CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    name: String,
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for CsvFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Table, FetchError> {
        let file = File::open(&self.path).map_err(|cause| FetchError::Unreachable {
            source_name: self.name.clone(),
            path: self.path.clone(),
            cause,
        })?;

        let table = Table::from_csv_reader(BufReader::new(file)).map_err(|err| {
            let reason = err.to_string();
            match err.into_kind() {
                // An I/O failure mid-read is still "unreachable", not "malformed".
                csv::ErrorKind::Io(cause) => FetchError::Unreachable {
                    source_name: self.name.clone(),
                    path: self.path.clone(),
                    cause,
                },
                _ => FetchError::Malformed {
                    source_name: self.name.clone(),
                    reason,
                },
            }
        })?;

        debug!(
            source = %self.name,
            path = ?self.path,
            rows = table.len(),
            columns = table.width(),
            "fetched source table"
        );
        Ok(table)
    }
}
