// src/engine/mod.rs

//! Host runtime for stagedag.
//!
//! This module ties together:
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the main runtime event loop that reacts to:
//!   - schedule ticks and sensor decisions
//!   - manual run requests
//!   - pipeline run completion
//!   - shutdown signals
//!
//! At most one pipeline run is in flight at any time. The pure core state
//! machine lives in [`core`]; the async/IO shell is implemented in
//! [`runtime`].

use std::collections::BTreeSet;

/// Why a pipeline run was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TriggerReason {
    /// The cron rule became due.
    Schedule,
    /// The sensor detected new input files.
    Sensor,
    /// Operator request (`run`, `serve --once`).
    Manual,
}

impl std::fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TriggerReason::Schedule => "schedule",
            TriggerReason::Sensor => "sensor",
            TriggerReason::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Outcome of one pipeline run as reported back to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed {
        /// Stage that failed, if the failure happened inside a stage.
        stage: Option<String>,
        message: String,
    },
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once no run is in flight and there are no
    /// queued triggers (used for `serve --once`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from trigger drivers, the backend, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A trigger source decided a run is warranted.
    Triggered {
        reason: TriggerReason,
        /// Newly detected input identifiers (sensor only).
        inputs: BTreeSet<String>,
    },
    /// A pipeline run finished.
    RunFinished { run_id: u64, outcome: RunOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

impl RuntimeEvent {
    pub fn triggered(reason: TriggerReason) -> Self {
        RuntimeEvent::Triggered {
            reason,
            inputs: BTreeSet::new(),
        }
    }
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep, RunRequest};
pub use queue::{TriggerBatch, TriggerQueue};
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::Runtime;
