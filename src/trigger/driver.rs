// src/trigger/driver.rs

//! Tokio tasks that evaluate trigger sources and feed the runtime.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::engine::RuntimeEvent;
use crate::trigger::decision::TriggerDecision;
use crate::trigger::schedule::ScheduleTrigger;
use crate::trigger::sensor::Sensor;

/// Sleep until each scheduled point and send a schedule trigger.
///
/// Points missed while the process was not running (or asleep) are not
/// replayed: after waking, the rule is evaluated at the current time and
/// the next point is computed from there.
pub fn spawn_schedule_driver(
    trigger: ScheduleTrigger,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> JoinHandle<()> {
    spawn_schedule_driver_with_clock(trigger, runtime_tx, Utc::now)
}

/// [`spawn_schedule_driver`] reading the current time from `clock`.
pub fn spawn_schedule_driver_with_clock<C>(
    trigger: ScheduleTrigger,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    clock: C,
) -> JoinHandle<()>
where
    C: Fn() -> DateTime<Utc> + Send + 'static,
{
    tokio::spawn(async move {
        info!(rule = %trigger.rule(), "schedule driver started");

        loop {
            let now = clock();
            let Some(next) = trigger.next_fire(now) else {
                warn!(rule = %trigger.rule(), "schedule never fires; stopping schedule driver");
                return;
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(%next, ?wait, "sleeping until next scheduled run");
            tokio::time::sleep(wait).await;

            match trigger.evaluate(clock()) {
                TriggerDecision::Run { reason, inputs } => {
                    if runtime_tx
                        .send(RuntimeEvent::Triggered { reason, inputs })
                        .await
                        .is_err()
                    {
                        debug!("runtime channel closed; stopping schedule driver");
                        return;
                    }
                }
                TriggerDecision::Skip => {
                    debug!(%next, "woke outside the scheduled minute; not backfilling");
                }
            }
        }
    })
}

/// Poll the sensor every `poll_interval`, and additionally whenever `wake_rx`
/// delivers a wakeup. The first poll happens immediately.
///
/// Each tick runs on a blocking thread since it reads the watch directory,
/// hashes files and syncs the ledger.
pub fn spawn_sensor_driver(
    sensor: Sensor,
    poll_interval: Duration,
    mut wake_rx: Option<mpsc::Receiver<()>>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            watch_dir = ?sensor.watch_dir(),
            ?poll_interval,
            "sensor driver started"
        );

        let mut sensor = sensor;
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let watcher_closed = tokio::select! {
                _ = interval.tick() => false,
                woke = next_wake(&mut wake_rx) => woke.is_none(),
            };
            if watcher_closed {
                debug!("input watcher closed; relying on polling only");
                wake_rx = None;
                continue;
            }

            let joined = tokio::task::spawn_blocking(move || {
                let decision = sensor.tick();
                (sensor, decision)
            })
            .await;

            let decision = match joined {
                Ok((returned, decision)) => {
                    sensor = returned;
                    decision
                }
                Err(err) => {
                    error!(error = %err, "sensor tick aborted; stopping sensor driver");
                    return;
                }
            };

            if let TriggerDecision::Run { reason, inputs } = decision {
                if runtime_tx
                    .send(RuntimeEvent::Triggered { reason, inputs })
                    .await
                    .is_err()
                {
                    debug!("runtime channel closed; stopping sensor driver");
                    return;
                }
            }
        }
    })
}

async fn next_wake(wake_rx: &mut Option<mpsc::Receiver<()>>) -> Option<()> {
    match wake_rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
