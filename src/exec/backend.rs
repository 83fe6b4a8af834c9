// src/exec/backend.rs

//! Pluggable pipeline backend abstraction.
//!
//! The runtime talks to a `PipelineBackend` instead of calling the executor
//! directly. This makes it easy to swap in a fake backend in tests.
//!
//! - `RealPipelineBackend` runs the resolved [`Pipeline`] on a blocking
//!   thread and reports `RunFinished` back to the runtime.
//! - Tests can provide their own `PipelineBackend` that, for example, records
//!   which runs were requested and directly emits `RunFinished` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info_span};

use crate::dag::Pipeline;
use crate::engine::{RunOutcome, RunRequest, RuntimeEvent};
use crate::errors::{PipelineError, Result};

/// Trait abstracting how a pipeline run is carried out.
pub trait PipelineBackend: Send {
    /// Begin the requested run.
    ///
    /// The implementation must eventually send exactly one
    /// `RuntimeEvent::RunFinished` carrying `request.run_id`; the returned
    /// future only covers handing the run off.
    fn start_run(
        &mut self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend.
pub struct RealPipelineBackend<T> {
    pipeline: Arc<Pipeline<T>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl<T> RealPipelineBackend<T> {
    pub fn new(pipeline: Arc<Pipeline<T>>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            pipeline,
            runtime_tx,
        }
    }
}

impl<T: 'static> PipelineBackend for RealPipelineBackend<T> {
    fn start_run(
        &mut self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone handles so the future doesn't borrow `self` across `await`.
        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            let run_id = request.run_id;

            tokio::spawn(async move {
                let blocking = tokio::task::spawn_blocking(move || {
                    let span = info_span!("run", run_id, reasons = ?request.reasons);
                    span.in_scope(|| outcome_of(pipeline.run().map(|_| ())))
                });

                let outcome = match blocking.await {
                    Ok(outcome) => outcome,
                    Err(join_err) => RunOutcome::Failed {
                        stage: None,
                        message: format!("pipeline run aborted: {join_err}"),
                    },
                };

                if tx
                    .send(RuntimeEvent::RunFinished { run_id, outcome })
                    .await
                    .is_err()
                {
                    debug!(run_id, "runtime gone before run completion could be reported");
                }
            });

            Ok(())
        })
    }
}

/// Collapse a run result into the outcome reported to the runtime.
pub fn outcome_of(result: std::result::Result<(), PipelineError>) -> RunOutcome {
    match result {
        Ok(()) => RunOutcome::Success,
        Err(err) => RunOutcome::Failed {
            stage: err.failed_stage().map(str::to_string),
            message: err.to_string(),
        },
    }
}
