// src/store/mod.rs

//! Persistence of the joined table.
//!
//! Every write is a full replace: after [`TableSink::replace`] returns, the
//! named table holds exactly the given rows.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::table::Table;

pub mod sqlite;

pub use sqlite::SqliteSink;

pub trait TableSink: Send + Sync + Debug {
    /// Replace the content of `table_name` with `table`, atomically.
    fn replace(&self, table_name: &str, table: &Table) -> Result<()>;
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Keeps written tables in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<String, Table>>,
    writes: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table_name: &str) -> Option<Table> {
        self.tables.lock().ok()?.get(table_name).cloned()
    }

    /// Number of successful `replace` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl TableSink for MemorySink {
    fn replace(&self, table_name: &str, table: &Table) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?;
        tables.insert(table_name.to_string(), table.clone());

        let mut writes = self
            .writes
            .lock()
            .map_err(|_| anyhow!("memory sink lock poisoned"))?;
        *writes += 1;
        Ok(())
    }
}
