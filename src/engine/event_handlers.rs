// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{error, info, warn};

use crate::engine::queue::{TriggerBatch, TriggerQueue};
use crate::engine::{RunOutcome, RuntimeOptions, TriggerReason};

/// A pipeline run the IO shell should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub run_id: u64,
    pub reasons: BTreeSet<TriggerReason>,
    /// Newly detected inputs that motivated the run (may be empty).
    pub inputs: BTreeSet<String>,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Hand this run to the pipeline backend.
    StartRun(RunRequest),
    /// Request that the process exits (used for `--once` when idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Which run (if any) is in flight, and the id the next run will get.
#[derive(Debug, Default)]
pub struct RunSlot {
    in_flight: Option<u64>,
    next_run_id: u64,
}

impl RunSlot {
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    fn start(&mut self, batch: TriggerBatch) -> RunRequest {
        self.next_run_id += 1;
        let run_id = self.next_run_id;
        self.in_flight = Some(run_id);

        info!(
            run_id,
            reasons = ?batch.reasons,
            inputs = batch.inputs.len(),
            "starting pipeline run"
        );

        RunRequest {
            run_id,
            reasons: batch.reasons,
            inputs: batch.inputs,
        }
    }
}

/// Handle a trigger.
///
/// - Idle: start a run now, folding in anything already queued.
/// - Busy: hand the trigger to the queue (queue or skip semantics).
pub fn handle_trigger(
    slot: &mut RunSlot,
    queue: &mut TriggerQueue,
    reason: TriggerReason,
    inputs: BTreeSet<String>,
) -> CoreStep {
    if let Some(run_id) = slot.in_flight() {
        if queue.record_trigger(reason, inputs) {
            info!(run_id, %reason, "run in progress; trigger queued");
        }
        return CoreStep::running(Vec::new());
    }

    let mut batch = TriggerBatch::new(reason, inputs);
    if let Some(pending) = queue.drain_pending() {
        batch.merge(pending);
    }

    CoreStep::running(vec![CoreCommand::StartRun(slot.start(batch))])
}

/// Handle completion of a pipeline run.
pub fn handle_run_finished(
    slot: &mut RunSlot,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    run_id: u64,
    outcome: RunOutcome,
) -> CoreStep {
    if slot.in_flight() != Some(run_id) {
        warn!(
            run_id,
            in_flight = ?slot.in_flight(),
            "completion for a run that is not in flight; ignoring"
        );
        return CoreStep::running(Vec::new());
    }
    slot.in_flight = None;

    match &outcome {
        RunOutcome::Success => info!(run_id, "pipeline run succeeded"),
        RunOutcome::Failed { stage, message } => {
            error!(run_id, stage = ?stage, error = %message, "pipeline run failed")
        }
    }

    let mut commands = Vec::new();
    if let Some(pending) = queue.drain_pending() {
        commands.push(CoreCommand::StartRun(slot.start(pending)));
    }

    // In `--once` mode, we can exit when nothing is running and there are no
    // pending triggers in the queue.
    if options.exit_when_idle && slot.is_idle() && queue.is_empty() {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }

    CoreStep::running(commands)
}
