// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - handing run requests to the pipeline backend
//! - handling Ctrl+C / shutdown
//!
//! The core is tested without any Tokio, channels, filesystem, or database.

use crate::engine::event_handlers::{handle_run_finished, handle_trigger, CoreStep, RunSlot};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// Owns the in-flight run slot, the trigger queue and runtime options. It has
/// **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    slot: RunSlot,
    queue: TriggerQueue,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new(
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            slot: RunSlot::default(),
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
        }
    }

    /// Whether no pipeline run is in flight.
    pub fn is_idle(&self) -> bool {
        self.slot.is_idle()
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.slot.in_flight()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::Triggered { reason, inputs } => {
                handle_trigger(&mut self.slot, &mut self.queue, reason, inputs)
            }
            RuntimeEvent::RunFinished { run_id, outcome } => handle_run_finished(
                &mut self.slot,
                &mut self.queue,
                &self.options,
                run_id,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}
