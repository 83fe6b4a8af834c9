// src/errors.rs

//! Crate-wide error types.
//!
//! Each layer of the engine fails with its own small error type so callers
//! can tell which layer failed:
//!
//! - [`RegistrationError`]: duplicate/unknown stage at setup time.
//! - [`ResolutionError`]: cycle or missing dependency, before any stage runs.
//! - [`StageExecutionError`]: a stage function failed; aborts that run only.
//! - [`LedgerIoError`]: the sensor could not read or write its ledger.
//!
//! [`PipelineError`] is the umbrella type used by the rest of the crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("stage '{0}' is already registered")]
    DuplicateStage(String),

    #[error("unknown stage '{0}'")]
    UnknownStage(String),
}

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency { stage: String, dependency: String },

    #[error("cyclic dependency between stages: {}", .stages.join(", "))]
    CyclicDependency { stages: Vec<String> },
}

/// A stage function returned an error during a run.
#[derive(Error, Debug)]
#[error("stage '{stage}' failed: {source:#}")]
pub struct StageExecutionError {
    pub stage: String,
    #[source]
    pub source: anyhow::Error,
}

/// Reading or appending to the processed-input ledger failed.
#[derive(Error, Debug)]
#[error("ledger I/O failed for {path:?}: {source:#}")]
pub struct LedgerIoError {
    pub path: PathBuf,
    #[source]
    pub source: anyhow::Error,
}

/// A cron rule could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid schedule '{rule}': {reason}")]
pub struct ScheduleError {
    pub rule: String,
    pub reason: String,
}

/// A data source could not produce its table.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("source '{source_name}' is unreachable at {path:?}: {cause}")]
    Unreachable {
        source_name: String,
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("source '{source_name}' is malformed: {reason}")]
    Malformed { source_name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    StageExecution(#[from] StageExecutionError),

    #[error(transparent)]
    LedgerIo(#[from] LedgerIoError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Name of the failing stage, if this error came out of a run.
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            PipelineError::StageExecution(e) => Some(e.stage.as_str()),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
