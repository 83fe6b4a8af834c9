// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::PipelineBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RunRequest, RuntimeEvent};

/// Drives the core runtime in response to `RuntimeEvent`s and delegates
/// pipeline runs to a `PipelineBackend`.
///
/// All run semantics live in `CoreRuntime`; this struct only reads events
/// from the channel and carries out the commands the core returns.
pub struct Runtime<B: PipelineBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
}

impl<B: PipelineBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: PipelineBackend> Runtime<B> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, backend: B) -> Self {
        Self {
            core,
            event_rx,
            backend,
        }
    }

    /// Main event loop.
    ///
    /// Returns when the channel closes, on shutdown, or when the core asks to
    /// exit (`exit_when_idle`).
    pub async fn run(mut self) -> Result<()> {
        info!("stagedag runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        if let Some(run_id) = self.core.in_flight() {
            info!(run_id, "exiting with a run still in flight; its result is discarded");
        }
        info!("runtime exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartRun(request) => self.start_run(request).await?,
            CoreCommand::RequestExit => {
                // `keep_running` is already false in this case.
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn start_run(&mut self, request: RunRequest) -> Result<()> {
        debug!(
            run_id = request.run_id,
            reasons = ?request.reasons,
            inputs = ?request.inputs,
            "handing run to backend"
        );
        self.backend.start_run(request).await
    }
}
