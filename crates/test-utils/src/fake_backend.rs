use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use stagedag::engine::{RunOutcome, RunRequest, RuntimeEvent};
use stagedag::errors::Result;
use stagedag::exec::PipelineBackend;

/// A fake pipeline backend that:
/// - records every run request it receives
/// - reports `RunFinished` with a fixed outcome after an optional delay
/// - tracks the highest number of runs it ever had in flight at once.
pub struct FakeBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    started: Arc<Mutex<Vec<RunRequest>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    delay: Duration,
    outcome: RunOutcome,
}

impl FakeBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            started: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            outcome: RunOutcome::Success,
        }
    }

    /// Each run takes `delay` before it reports completion.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_outcome(mut self, outcome: RunOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Shared log of run requests, in the order they were started.
    pub fn started(&self) -> Arc<Mutex<Vec<RunRequest>>> {
        Arc::clone(&self.started)
    }

    pub fn max_in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_in_flight)
    }
}

impl PipelineBackend for FakeBackend {
    fn start_run(
        &mut self,
        request: RunRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let max_in_flight = Arc::clone(&self.max_in_flight);
        let delay = self.delay;
        let outcome = self.outcome.clone();

        self.started.lock().unwrap().push(request.clone());

        Box::pin(async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);

            let run_id = request.run_id;
            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
                let _ = tx.send(RuntimeEvent::RunFinished { run_id, outcome }).await;
            });
            Ok(())
        })
    }
}
