// src/trigger/decision.rs

use std::collections::BTreeSet;

use crate::engine::TriggerReason;

/// Outcome of evaluating a trigger source once.
///
/// Consumed exactly once by whoever invokes the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    /// A run is requested. `inputs` carries newly detected identifiers for
    /// sensor triggers and is empty for schedule/manual triggers.
    Run {
        reason: TriggerReason,
        inputs: BTreeSet<String>,
    },
    /// Nothing to do this time.
    Skip,
}

impl TriggerDecision {
    pub fn run(reason: TriggerReason) -> Self {
        TriggerDecision::Run {
            reason,
            inputs: BTreeSet::new(),
        }
    }

    pub fn is_run(&self) -> bool {
        matches!(self, TriggerDecision::Run { .. })
    }

    /// Newly detected inputs carried by a run request.
    pub fn inputs(&self) -> Option<&BTreeSet<String>> {
        match self {
            TriggerDecision::Run { inputs, .. } => Some(inputs),
            TriggerDecision::Skip => None,
        }
    }
}
