// src/trigger/mod.rs

//! Trigger sources: deciding *when* the pipeline should run.
//!
//! This module is responsible for:
//! - The time-based schedule (a cron rule evaluated in UTC).
//! - The change detector: listing the watch directory, comparing the inputs
//!   against the durable processed-input ledger, and committing new
//!   identifiers before a run is requested.
//! - Driver tasks that evaluate both sources and feed the runtime, with an
//!   optional `notify` watcher that wakes the sensor early.
//!
//! It does **not** know about stages; it only turns time and filesystem
//! state into [`TriggerDecision`]s.

pub mod decision;
pub mod driver;
pub mod hash;
pub mod ledger;
pub mod path_utils;
pub mod patterns;
pub mod schedule;
pub mod sensor;
pub mod watcher;

pub use decision::TriggerDecision;
pub use driver::{spawn_schedule_driver, spawn_schedule_driver_with_clock, spawn_sensor_driver};
pub use hash::{compute_file_hash, content_identity};
pub use ledger::{parse_ledger, FileLedger, LedgerStore, MemoryLedger};
pub use patterns::InputPatterns;
pub use schedule::{due, CronSchedule, ScheduleTrigger};
pub use sensor::{check, Detection, Sensor};
pub use watcher::{spawn_input_watcher, WatcherHandle};
