// src/store/sqlite.rs

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use super::{is_plain_identifier, TableSink};
use crate::table::Table;

/// SQLite-backed sink.
///
/// Each replace runs in a single transaction (drop, create, insert), so a
/// failed write leaves the previous content in place.
#[derive(Debug)]
pub struct SqliteSink {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

/// Storage class chosen per column from its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Affinity {
    Integer,
    Real,
    Text,
}

impl Affinity {
    fn sql(self) -> &'static str {
        match self {
            Affinity::Integer => "INTEGER",
            Affinity::Real => "REAL",
            Affinity::Text => "TEXT",
        }
    }

    fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let mut affinity = Affinity::Integer;
        let mut seen_value = false;

        for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
            seen_value = true;
            if affinity == Affinity::Integer && cell.parse::<i64>().is_err() {
                affinity = Affinity::Real;
            }
            if affinity == Affinity::Real && cell.parse::<f64>().is_err() {
                return Affinity::Text;
            }
        }

        if seen_value { affinity } else { Affinity::Text }
    }

    fn value(self, cell: &str) -> Value {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match self {
            Affinity::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            Affinity::Real => trimmed
                .parse::<f64>()
                .map(Value::Real)
                .unwrap_or_else(|_| Value::Text(cell.to_string())),
            Affinity::Text => Value::Text(cell.to_string()),
        }
    }
}

impl SqliteSink {
    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {parent:?}"))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening sqlite database {path:?}"))?;
        debug!(?path, "opened sqlite database");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory sqlite database")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("sqlite connection lock poisoned"))
    }

    /// Read a whole table back, rendering every value as text (`NULL` as an
    /// empty cell).
    pub fn read_table(&self, table_name: &str) -> Result<Table> {
        if !is_plain_identifier(table_name) {
            bail!("invalid table name '{table_name}'");
        }
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote(table_name)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i).map(render))
                    .collect::<rusqlite::Result<Vec<String>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Table::from_rows(columns, rows)
    }

    /// Number of rows in `table_name`, or `None` if the table does not exist.
    pub fn row_count(&self, table_name: &str) -> Result<Option<u64>> {
        if !is_plain_identifier(table_name) {
            bail!("invalid table name '{table_name}'");
        }
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table_name],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(None);
        }
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", quote(table_name)), [], |row| {
                row.get(0)
            })?;
        Ok(Some(count as u64))
    }
}

impl TableSink for SqliteSink {
    fn replace(&self, table_name: &str, table: &Table) -> Result<()> {
        if !is_plain_identifier(table_name) {
            bail!("invalid table name '{table_name}'");
        }
        if table.width() == 0 {
            bail!("cannot persist a table with no columns");
        }

        let affinities: Vec<Affinity> = (0..table.width())
            .map(|i| Affinity::infer(table.rows().iter().map(|r| r[i].as_str())))
            .collect();

        let column_defs: Vec<String> = table
            .columns()
            .iter()
            .zip(&affinities)
            .map(|(name, a)| format!("{} {}", quote(name), a.sql()))
            .collect();
        let placeholders = vec!["?"; table.width()].join(", ");
        let target = quote(table_name);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(&format!("DROP TABLE IF EXISTS {target}"), [])?;
        tx.execute(
            &format!("CREATE TABLE {target} ({})", column_defs.join(", ")),
            [],
        )?;
        {
            let mut insert =
                tx.prepare(&format!("INSERT INTO {target} VALUES ({placeholders})"))?;
            for row in table.rows() {
                let values = row.iter().zip(&affinities).map(|(cell, a)| a.value(cell));
                insert.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        info!(
            table = %table_name,
            rows = table.len(),
            columns = table.width(),
            "replaced table content"
        );
        Ok(())
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn render(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
    }
}
