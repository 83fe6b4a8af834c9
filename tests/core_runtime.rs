// tests/core_runtime.rs

use std::collections::BTreeSet;

use stagedag::engine::{
    CoreCommand, CoreRuntime, RunOutcome, RunRequest, RuntimeEvent, RuntimeOptions, TriggerBatch,
    TriggerQueue, TriggerReason, TriggerWhileRunningBehaviour,
};

fn inputs(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn sensor(items: &[&str]) -> RuntimeEvent {
    RuntimeEvent::Triggered {
        reason: TriggerReason::Sensor,
        inputs: inputs(items),
    }
}

fn finished(run_id: u64) -> RuntimeEvent {
    RuntimeEvent::RunFinished {
        run_id,
        outcome: RunOutcome::Success,
    }
}

fn started(commands: &[CoreCommand]) -> Vec<RunRequest> {
    commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::StartRun(r) => Some(r.clone()),
            CoreCommand::RequestExit => None,
        })
        .collect()
}

fn queueing(queue_length: usize) -> CoreRuntime {
    CoreRuntime::new(
        TriggerWhileRunningBehaviour::Queue,
        queue_length,
        RuntimeOptions::default(),
    )
}

#[test]
fn idle_trigger_starts_a_run() {
    let mut core = queueing(1);

    let step = core.step(RuntimeEvent::triggered(TriggerReason::Schedule));
    assert!(step.keep_running);

    let runs = started(&step.commands);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, 1);
    assert_eq!(runs[0].reasons, [TriggerReason::Schedule].into_iter().collect());
    assert!(runs[0].inputs.is_empty());
    assert_eq!(core.in_flight(), Some(1));
}

#[test]
fn triggers_during_a_run_coalesce_into_one_follow_up() {
    let mut core = queueing(1);

    core.step(sensor(&["a.csv"]));
    assert!(core.step(RuntimeEvent::triggered(TriggerReason::Schedule)).commands.is_empty());
    assert!(core.step(sensor(&["b.csv"])).commands.is_empty());
    assert!(core.step(sensor(&["c.csv"])).commands.is_empty());
    assert!(!core.queue_is_empty());

    let step = core.step(finished(1));
    let runs = started(&step.commands);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, 2);
    assert_eq!(
        runs[0].reasons,
        [TriggerReason::Schedule, TriggerReason::Sensor].into_iter().collect()
    );
    assert_eq!(runs[0].inputs, inputs(&["b.csv", "c.csv"]));
    assert!(core.queue_is_empty());

    // Nothing left: the second completion leaves the runtime idle.
    let step = core.step(finished(2));
    assert!(step.commands.is_empty());
    assert!(core.is_idle());
}

#[test]
fn never_more_than_one_run_in_flight() {
    let mut core = queueing(4);
    let mut in_flight = 0usize;

    let events = vec![
        sensor(&["a"]),
        sensor(&["b"]),
        RuntimeEvent::triggered(TriggerReason::Manual),
        finished(1),
        sensor(&["c"]),
        finished(2),
        finished(3),
    ];

    for event in events {
        if matches!(event, RuntimeEvent::RunFinished { .. }) {
            in_flight = in_flight.saturating_sub(1);
        }
        let step = core.step(event);
        in_flight += started(&step.commands).len();
        assert!(in_flight <= 1, "more than one run in flight");
    }
    assert!(core.is_idle());
}

#[test]
fn skip_mode_drops_triggers_while_busy() {
    let mut core = CoreRuntime::new(
        TriggerWhileRunningBehaviour::Skip,
        1,
        RuntimeOptions::default(),
    );

    core.step(RuntimeEvent::triggered(TriggerReason::Schedule));
    assert!(core.step(sensor(&["late.csv"])).commands.is_empty());
    assert!(core.queue_is_empty());

    let step = core.step(finished(1));
    assert!(step.commands.is_empty());
    assert!(core.is_idle());
}

#[test]
fn exit_when_idle_stops_after_the_last_run() {
    let mut core = CoreRuntime::new(
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );

    core.step(RuntimeEvent::triggered(TriggerReason::Manual));
    core.step(RuntimeEvent::triggered(TriggerReason::Schedule));

    // A queued trigger keeps the runtime alive for one more run.
    let step = core.step(finished(1));
    assert!(step.keep_running);
    assert_eq!(started(&step.commands).len(), 1);

    let step = core.step(RuntimeEvent::RunFinished {
        run_id: 2,
        outcome: RunOutcome::Failed {
            stage: Some("covid_data".to_string()),
            message: "boom".to_string(),
        },
    });
    assert!(!step.keep_running);
    assert_eq!(step.commands, vec![CoreCommand::RequestExit]);
}

#[test]
fn stale_completion_is_ignored() {
    let mut core = queueing(1);
    core.step(RuntimeEvent::triggered(TriggerReason::Manual));

    let step = core.step(finished(7));
    assert!(step.commands.is_empty());
    assert!(step.keep_running);
    assert_eq!(core.in_flight(), Some(1));
}

#[test]
fn failed_run_does_not_block_the_next_trigger() {
    let mut core = queueing(1);
    core.step(RuntimeEvent::triggered(TriggerReason::Schedule));
    core.step(RuntimeEvent::RunFinished {
        run_id: 1,
        outcome: RunOutcome::Failed {
            stage: None,
            message: "database locked".to_string(),
        },
    });

    let runs = started(&core.step(RuntimeEvent::triggered(TriggerReason::Schedule)).commands);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, 2);
}

#[test]
fn shutdown_stops_the_loop() {
    let mut core = queueing(1);
    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(!step.keep_running);
    assert!(step.commands.is_empty());
}

#[test]
fn full_queue_merges_into_newest_batch() {
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 2);

    assert!(queue.record_trigger(TriggerReason::Sensor, inputs(&["a"])));
    assert!(queue.record_trigger(TriggerReason::Schedule, inputs(&[])));
    assert!(queue.record_trigger(TriggerReason::Sensor, inputs(&["b"])));
    assert_eq!(queue.len(), 2);

    let merged = queue.drain_pending().unwrap();
    let mut expected = TriggerBatch::new(TriggerReason::Sensor, inputs(&["a"]));
    expected.merge(TriggerBatch::new(TriggerReason::Schedule, inputs(&["b"])));
    assert_eq!(merged, expected);
    assert!(queue.drain_pending().is_none());
}

#[test]
fn queue_length_zero_is_clamped_to_one() {
    let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
    queue.record_trigger(TriggerReason::Sensor, inputs(&["a"]));
    queue.record_trigger(TriggerReason::Sensor, inputs(&["b"]));
    assert_eq!(queue.len(), 1);
}
