// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::engine::TriggerReason;
use crate::types::TriggerWhileRunningBehaviour;

/// A set of triggers that will be served together by one future run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerBatch {
    pub reasons: BTreeSet<TriggerReason>,
    pub inputs: BTreeSet<String>,
}

impl TriggerBatch {
    pub fn new(reason: TriggerReason, inputs: BTreeSet<String>) -> Self {
        let mut reasons = BTreeSet::new();
        reasons.insert(reason);
        Self { reasons, inputs }
    }

    pub fn merge(&mut self, other: TriggerBatch) {
        self.reasons.extend(other.reasons);
        self.inputs.extend(other.inputs);
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Queue of triggers that arrive while a pipeline run is already executing.
///
/// Semantics:
/// - Each queued entry is a [`TriggerBatch`].
/// - `max_runs` (`queue_length`) bounds how many batches are kept. A trigger
///   arriving when the queue is full is folded into the newest batch, so
///   sensor inputs that are already in the ledger stay attached to some
///   future run.
/// - When the runtime becomes idle it calls [`TriggerQueue::drain_pending`],
///   which merges every queued batch into one follow-up run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<TriggerBatch>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Record a trigger that arrived while a run is in flight.
    ///
    /// Returns `false` if the trigger was dropped (`skip` behaviour).
    pub fn record_trigger(&mut self, reason: TriggerReason, inputs: BTreeSet<String>) -> bool {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Skip => {
                warn!(
                    %reason,
                    inputs = inputs.len(),
                    "run in progress; dropping trigger (skip mode)"
                );
                false
            }
            TriggerWhileRunningBehaviour::Queue => {
                let batch = TriggerBatch::new(reason, inputs);

                if self.runs.len() >= self.max_runs {
                    if let Some(last) = self.runs.back_mut() {
                        last.merge(batch);
                        debug!(
                            %reason,
                            max_runs = self.max_runs,
                            "queue full; merged trigger into newest queued batch"
                        );
                        return true;
                    }
                }

                self.runs.push_back(batch);
                debug!(%reason, queued = self.runs.len(), "queued trigger for a follow-up run");
                true
            }
        }
    }

    /// Drain all pending batches, merged into one.
    ///
    /// Returns `None` when nothing was queued.
    pub fn drain_pending(&mut self) -> Option<TriggerBatch> {
        let mut merged: Option<TriggerBatch> = None;

        while let Some(batch) = self.runs.pop_front() {
            match merged.as_mut() {
                Some(m) => m.merge(batch),
                None => merged = Some(batch),
            }
        }

        if let Some(batch) = &merged {
            debug!(
                reasons = ?batch.reasons,
                inputs = batch.inputs.len(),
                "drained queued triggers into new run"
            );
        }
        merged
    }
}
