// src/trigger/sensor.rs

//! Change detector: decides whether new inputs warrant a pipeline run.
//!
//! [`check`] is the pure set-difference; [`Sensor`] wraps it with directory
//! observation and the durable ledger.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::engine::TriggerReason;
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::trigger::decision::TriggerDecision;
use crate::trigger::hash::content_identity;
use crate::trigger::ledger::LedgerStore;
use crate::trigger::patterns::InputPatterns;
use crate::types::IdentityMode;

/// Result of comparing current observations against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Identifiers observed now that the ledger has never seen.
    pub new: BTreeSet<String>,
    /// The ledger after recording `new`.
    pub ledger: BTreeSet<String>,
}

impl Detection {
    pub fn run_requested(&self) -> bool {
        !self.new.is_empty()
    }
}

/// `new = current - ledger`, `ledger' = ledger ∪ new`.
///
/// Calling this again with the same `current` and the returned ledger yields
/// an empty `new`.
pub fn check(current: &BTreeSet<String>, ledger: &BTreeSet<String>) -> Detection {
    let new: BTreeSet<String> = current.difference(ledger).cloned().collect();

    let ledger = if new.is_empty() {
        ledger.clone()
    } else {
        ledger.union(&new).cloned().collect()
    };

    Detection { new, ledger }
}

/// Polls a directory for new input files.
///
/// Each [`Sensor::tick`] lists the watch directory, compares the matching
/// files against the ledger, and records any new identifiers in the ledger
/// *before* reporting a run.
pub struct Sensor {
    fs: Arc<dyn FileSystem>,
    watch_dir: PathBuf,
    patterns: InputPatterns,
    identity: IdentityMode,
    ledger: Box<dyn LedgerStore>,
}

impl fmt::Debug for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sensor")
            .field("watch_dir", &self.watch_dir)
            .field("patterns", &self.patterns)
            .field("identity", &self.identity)
            .field("ledger", &self.ledger.location())
            .finish()
    }
}

impl Sensor {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        watch_dir: impl Into<PathBuf>,
        patterns: InputPatterns,
        identity: IdentityMode,
        ledger: Box<dyn LedgerStore>,
    ) -> Self {
        Self {
            fs,
            watch_dir: watch_dir.into(),
            patterns,
            identity,
            ledger,
        }
    }

    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    pub fn patterns(&self) -> &InputPatterns {
        &self.patterns
    }

    /// Identifiers of the input files currently present in the watch
    /// directory (non-recursive).
    pub fn observe(&self) -> anyhow::Result<BTreeSet<String>> {
        let entries = self
            .fs
            .read_dir(&self.watch_dir)
            .with_context(|| format!("listing watch directory {:?}", self.watch_dir))?;

        let mut current = BTreeSet::new();

        for path in entries {
            if !self.fs.is_file(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!(?path, "skipping input with non UTF-8 name");
                continue;
            };
            if !self.patterns.matches(name) {
                continue;
            }

            match self.identify(&path) {
                Ok(id) => {
                    debug!(id = %id, "observed input");
                    current.insert(id);
                }
                Err(err) => {
                    // Typically a file removed between listing and hashing.
                    warn!(?path, error = %format!("{err:#}"), "could not identify input; skipping it this cycle");
                }
            }
        }

        Ok(current)
    }

    fn identify(&self, path: &Path) -> anyhow::Result<String> {
        match self.identity {
            IdentityMode::Path => Ok(path.display().to_string()),
            IdentityMode::Content => content_identity(self.fs.as_ref(), path),
        }
    }

    /// One detection pass, surfacing errors.
    ///
    /// The ledger is appended to (and synced) before this returns a
    /// detection that requests a run.
    pub fn try_tick(&mut self) -> Result<Detection> {
        let current = self.observe().map_err(PipelineError::Other)?;
        let ledger = self.ledger.load()?;

        let detection = check(&current, &ledger);
        if detection.run_requested() {
            self.ledger.record(&detection.new)?;
        }

        Ok(detection)
    }

    /// One detection pass for the polling loop.
    ///
    /// Never fails: I/O problems are logged and reported as
    /// [`TriggerDecision::Skip`], and the next poll simply tries again.
    pub fn tick(&mut self) -> TriggerDecision {
        match self.try_tick() {
            Ok(detection) if detection.run_requested() => {
                let found: Vec<&str> = detection.new.iter().map(|s| s.as_str()).collect();
                info!(new = ?found, "found new input files; requesting pipeline run");
                TriggerDecision::Run {
                    reason: TriggerReason::Sensor,
                    inputs: detection.new,
                }
            }
            Ok(_) => {
                info!("no new input files detected");
                TriggerDecision::Skip
            }
            Err(err) => {
                error!(
                    watch_dir = ?self.watch_dir,
                    ledger = ?self.ledger.location(),
                    error = %err,
                    "sensor pass failed; not requesting a run this cycle"
                );
                TriggerDecision::Skip
            }
        }
    }
}
