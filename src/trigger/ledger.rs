// src/trigger/ledger.rs

//! Processed-input ledger: the durable set of input identifiers the sensor
//! has already seen.
//!
//! The on-disk format is a flat, append-only text file with one identifier
//! per line. Readers de-duplicate and ignore blank lines, so the file can be
//! inspected or re-derived with ordinary text tools.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::errors::LedgerIoError;
use crate::fs::FileSystem;

/// Abstract storage for the ledger.
///
/// Implementations only ever grow: there is no removal operation.
pub trait LedgerStore: Send + Sync {
    /// Read the current set of recorded identifiers.
    fn load(&self) -> Result<BTreeSet<String>, LedgerIoError>;

    /// Durably record `ids`. Recording an identifier twice is harmless.
    fn record(&mut self, ids: &BTreeSet<String>) -> Result<(), LedgerIoError>;

    /// Where the ledger lives, for diagnostics.
    fn location(&self) -> &Path;
}

/// Ledger backed by a newline-delimited file.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    fn io_error(&self, source: anyhow::Error) -> LedgerIoError {
        LedgerIoError {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerStore for FileLedger {
    fn load(&self) -> Result<BTreeSet<String>, LedgerIoError> {
        if !self.fs.exists(&self.path) {
            debug!(path = ?self.path, "ledger file does not exist yet; treating as empty");
            return Ok(BTreeSet::new());
        }

        let contents = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| self.io_error(e))?;

        Ok(parse_ledger(&contents))
    }

    fn record(&mut self, ids: &BTreeSet<String>) -> Result<(), LedgerIoError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for id in ids {
            if id.contains(['\n', '\r']) {
                return Err(self.io_error(anyhow!(
                    "identifier {id:?} contains a line break"
                )));
            }
            buf.push_str(id);
            buf.push('\n');
        }

        self.fs
            .append(&self.path, buf.as_bytes())
            .map_err(|e| self.io_error(e))?;

        info!(path = ?self.path, recorded = ids.len(), "recorded inputs in ledger (file)");
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Ledger held in memory only (lost on restart).
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    ids: BTreeSet<String>,
    path: PathBuf,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            ids: BTreeSet::new(),
            path: PathBuf::from("<memory>"),
        }
    }

    pub fn with_entries<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            path: PathBuf::from("<memory>"),
        }
    }
}

impl LedgerStore for MemoryLedger {
    fn load(&self) -> Result<BTreeSet<String>, LedgerIoError> {
        Ok(self.ids.clone())
    }

    fn record(&mut self, ids: &BTreeSet<String>) -> Result<(), LedgerIoError> {
        self.ids.extend(ids.iter().cloned());
        info!(recorded = ids.len(), "recorded inputs in ledger (memory)");
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Parse ledger file contents into a set of identifiers.
pub fn parse_ledger(contents: &str) -> BTreeSet<String> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
