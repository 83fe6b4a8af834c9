// tests/runtime_fake_backend.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::atomic::Ordering;
use std::time::Duration;

use stagedag::engine::{
    CoreRuntime, RunOutcome, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
    TriggerWhileRunningBehaviour,
};
use stagedag_test_utils::fake_backend::FakeBackend;
use tokio::sync::mpsc;

#[tokio::test]
async fn overlapping_triggers_never_run_concurrently() {
    init_tracing();

    let (tx, rx) = mpsc::channel(16);
    let backend = FakeBackend::new(tx.clone()).with_delay(Duration::from_millis(100));
    let started = backend.started();
    let max_in_flight = backend.max_in_flight();

    let core = CoreRuntime::new(
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let runtime = Runtime::new(core, rx, backend);

    tx.send(RuntimeEvent::triggered(TriggerReason::Manual))
        .await
        .unwrap();
    tx.send(RuntimeEvent::triggered(TriggerReason::Schedule))
        .await
        .unwrap();
    tx.send(RuntimeEvent::Triggered {
        reason: TriggerReason::Sensor,
        inputs: ["data/new.csv".to_string()].into_iter().collect(),
    })
    .await
    .unwrap();

    with_timeout(runtime.run()).await.unwrap();

    let started = started.lock().unwrap();
    assert_eq!(started.len(), 2);
    assert_eq!(started[0].run_id, 1);
    assert_eq!(
        started[0].reasons,
        [TriggerReason::Manual].into_iter().collect()
    );
    assert_eq!(started[1].run_id, 2);
    assert_eq!(
        started[1].reasons,
        [TriggerReason::Schedule, TriggerReason::Sensor]
            .into_iter()
            .collect()
    );
    assert!(started[1].inputs.contains("data/new.csv"));
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_run_still_lets_the_runtime_exit() {
    init_tracing();

    let (tx, rx) = mpsc::channel(16);
    let backend = FakeBackend::new(tx.clone()).with_outcome(RunOutcome::Failed {
        stage: Some("weather_data".to_string()),
        message: "source is unreachable".to_string(),
    });
    let started = backend.started();

    let core = CoreRuntime::new(
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );

    tx.send(RuntimeEvent::triggered(TriggerReason::Manual))
        .await
        .unwrap();

    with_timeout(Runtime::new(core, rx, backend).run())
        .await
        .unwrap();

    assert_eq!(started.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn shutdown_event_stops_the_runtime() {
    init_tracing();

    let (tx, rx) = mpsc::channel(16);
    let backend = FakeBackend::new(tx.clone());
    let started = backend.started();

    let core = CoreRuntime::new(
        TriggerWhileRunningBehaviour::Skip,
        1,
        RuntimeOptions::default(),
    );

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(Runtime::new(core, rx, backend).run())
        .await
        .unwrap();

    assert!(started.lock().unwrap().is_empty());
}

#[tokio::test]
async fn closed_channel_ends_the_runtime() {
    init_tracing();

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(16);
    let (backend_tx, _backend_rx) = mpsc::channel(16);
    let backend = FakeBackend::new(backend_tx);

    let core = CoreRuntime::new(
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions::default(),
    );
    drop(tx);

    with_timeout(Runtime::new(core, rx, backend).run())
        .await
        .unwrap();
}
