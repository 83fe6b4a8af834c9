// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod table;
pub mod trigger;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, ConfigFile};
use crate::dag::{Pipeline, StageRegistry};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::exec::RealPipelineBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::store::MemorySink;
use crate::table::Table;
use crate::trigger::{
    spawn_input_watcher, spawn_schedule_driver, spawn_sensor_driver, FileLedger, ScheduleTrigger,
    Sensor,
};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config {:?}", args.config))?;
    debug!(?cfg, "configuration loaded");

    match args.command {
        Command::Run => run_now(&cfg).await,
        Command::Serve { once } => serve(cfg, once).await,
        Command::Plan => print_plan(&cfg),
        Command::Sense => sense(&cfg).await,
        Command::Due { at } => {
            print_due(&cfg, at.unwrap_or_else(Utc::now));
            Ok(())
        }
    }
}

/// Execute the pipeline once, in the foreground.
async fn run_now(cfg: &ConfigFile) -> Result<()> {
    let pipeline = pipeline::from_config(cfg)?;

    let result = tokio::task::spawn_blocking(move || pipeline.run())
        .await
        .context("pipeline run aborted")??;

    println!(
        "pipeline run succeeded: {} stage(s) executed ({})",
        result.executed.len(),
        result.executed.join(" -> ")
    );
    Ok(())
}

/// Host runtime: schedule + sensor drivers feeding a single-flight runtime.
///
/// With `once`, a single manual run is requested and the runtime exits when
/// it is idle again; no trigger drivers are started.
async fn serve(cfg: ConfigFile, once: bool) -> Result<()> {
    let pipeline = Arc::new(pipeline::from_config(&cfg)?);
    info!(order = %pipeline.order(), "pipeline resolved");

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let backend = RealPipelineBackend::new(Arc::clone(&pipeline), rt_tx.clone());

    let mut drivers = Vec::new();
    let mut _watcher_handle = None;

    if once {
        rt_tx
            .send(RuntimeEvent::triggered(TriggerReason::Manual))
            .await
            .context("seeding manual run")?;
    } else {
        if cfg.schedule.enabled {
            let trigger = ScheduleTrigger::new(cfg.schedule.rule.clone());
            drivers.push(spawn_schedule_driver(trigger, rt_tx.clone()));
        }

        if cfg.sensor.enabled {
            let wake_rx = if cfg.sensor.notify {
                let (wake_tx, wake_rx) = mpsc::channel::<()>(1);
                match spawn_input_watcher(&cfg.sensor.watch_dir, cfg.sensor.patterns.clone(), wake_tx) {
                    Ok(handle) => {
                        _watcher_handle = Some(handle);
                        Some(wake_rx)
                    }
                    Err(err) => {
                        warn!(error = %format!("{err:#}"), "input watcher unavailable; sensor will only poll");
                        None
                    }
                }
            } else {
                None
            };

            drivers.push(spawn_sensor_driver(
                build_sensor(&cfg),
                cfg.sensor.poll_interval,
                wake_rx,
                rt_tx.clone(),
            ));
        }

        if drivers.is_empty() {
            warn!("schedule and sensor are both disabled; waiting for shutdown only");
        }
    }

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }
    drop(rt_tx);

    let options = RuntimeOptions {
        exit_when_idle: once,
    };
    let core = CoreRuntime::new(
        cfg.runtime.triggered_while_running_behaviour,
        cfg.runtime.queue_length,
        options,
    );

    let result = Runtime::new(core, rt_rx, backend).run().await;

    for driver in drivers {
        driver.abort();
    }

    Ok(result?)
}

/// Sensor over the configured watch directory and on-disk ledger.
pub fn build_sensor(cfg: &ConfigFile) -> Sensor {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let ledger = FileLedger::new(&cfg.sensor.ledger, Arc::clone(&fs));

    Sensor::new(
        fs,
        &cfg.sensor.watch_dir,
        cfg.sensor.patterns.clone(),
        cfg.sensor.identity,
        Box::new(ledger),
    )
}

/// One sensor pass; errors are reported rather than turned into "no run".
async fn sense(cfg: &ConfigFile) -> Result<()> {
    let mut sensor = build_sensor(cfg);
    let detection = tokio::task::spawn_blocking(move || sensor.try_tick())
        .await
        .context("sensor pass aborted")??;

    if detection.new.is_empty() {
        println!("no new inputs ({} already processed)", detection.ledger.len());
    } else {
        println!("{} new input(s), recorded in {:?}:", detection.new.len(), cfg.sensor.ledger);
        for id in &detection.new {
            println!("  {id}");
        }
    }
    Ok(())
}

/// Dry run: resolve the stage graph and describe the triggers.
fn print_plan(cfg: &ConfigFile) -> Result<()> {
    // The sink is never invoked; planning must not create the database.
    let registry: StageRegistry<Table> = pipeline::covid_weather_registry(
        pipeline::sources_from_config(cfg),
        Arc::new(MemorySink::new()),
        cfg.pipeline.table.clone(),
    )?;
    let plan = Pipeline::new(registry)?;

    println!("stagedag plan");
    println!("  order: {}", plan.order());
    for (i, name) in plan.order().iter().enumerate() {
        let stage = plan.registry().get(name)?;
        if stage.dependencies().is_empty() {
            println!("  {}. {name}", i + 1);
        } else {
            println!("  {}. {name} (after: {})", i + 1, stage.dependencies().join(", "));
        }
    }
    println!();
    println!("  table:    {}", cfg.pipeline.table);
    println!("  database: {}", cfg.pipeline.database.display());
    println!(
        "  schedule: {} ({})",
        cfg.schedule.rule,
        if cfg.schedule.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  sensor:   {} {:?} every {:?} ({})",
        cfg.sensor.watch_dir.display(),
        cfg.sensor.patterns.include(),
        cfg.sensor.poll_interval,
        if cfg.sensor.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  while running: {:?} (queue_length = {})",
        cfg.runtime.triggered_while_running_behaviour, cfg.runtime.queue_length
    );

    debug!("plan complete (no execution)");
    Ok(())
}

fn print_due(cfg: &ConfigFile, at: DateTime<Utc>) {
    let trigger = ScheduleTrigger::new(cfg.schedule.rule.clone());
    let decision = trigger.evaluate(at);

    println!(
        "{}: {} at {}",
        trigger.rule(),
        if decision.is_run() { "due" } else { "not due" },
        at.to_rfc3339()
    );
    match trigger.next_fire(at) {
        Some(next) => println!("next run: {}", next.to_rfc3339()),
        None => println!("next run: never"),
    }
}
