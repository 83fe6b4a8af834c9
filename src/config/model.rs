// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::trigger::{CronSchedule, InputPatterns};
use crate::types::{IdentityMode, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [pipeline]
/// table = "covid_weather_data"
/// database = "data/pipeline.db"
///
/// [runtime]
/// triggered_while_running_behaviour = "queue"
/// queue_length = 1
///
/// [schedule]
/// cron = "0 0 * * *"
///
/// [sensor]
/// watch_dir = "data"
/// patterns = ["*.csv"]
/// ledger = "data/processed_files.txt"
/// poll_interval = "30s"
/// ```
///
/// All sections are optional and have the defaults shown.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub pipeline: RawPipelineSection,

    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub schedule: RawScheduleSection,

    #[serde(default)]
    pub sensor: RawSensorSection,
}

/// `[pipeline]` section: where data comes from and where it goes.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipelineSection {
    /// Destination table, replaced on every run.
    #[serde(default = "default_table")]
    pub table: String,

    /// SQLite database file. Overridden by `DATABASE_URL`.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default = "default_covid_source")]
    pub covid_source: PathBuf,

    #[serde(default = "default_weather_source")]
    pub weather_source: PathBuf,
}

fn default_table() -> String {
    "covid_weather_data".to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from("data/pipeline.db")
}

fn default_covid_source() -> PathBuf {
    PathBuf::from("data/time_series_covid19_confirmed_global.csv")
}

fn default_weather_source() -> PathBuf {
    PathBuf::from("data/PRECIP_HLY_sample_csv.csv")
}

impl Default for RawPipelineSection {
    fn default() -> Self {
        Self {
            table: default_table(),
            database: default_database(),
            covid_source: default_covid_source(),
            weather_source: default_weather_source(),
        }
    }
}

/// `[runtime]` section.
///
/// Controls behaviour when triggers arrive while a run is in flight.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    /// `"queue"` (default) or `"skip"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued trigger batches.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_queue_length() -> usize {
    1
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// `[schedule]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawScheduleSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Five-field cron rule, evaluated in UTC.
    #[serde(default = "default_cron")]
    pub cron: String,
}

fn default_true() -> bool {
    true
}

fn default_cron() -> String {
    "0 0 * * *".to_string()
}

impl Default for RawScheduleSection {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_cron(),
        }
    }
}

/// `[sensor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSensorSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory listed (non-recursively) on every poll.
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Glob patterns matched against file names in `watch_dir`.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Processed-input ledger (newline-delimited identifiers).
    #[serde(default = "default_ledger")]
    pub ledger: PathBuf,

    /// Duration string such as `"30s"`, `"500ms"`, `"5m"`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default)]
    pub identity: IdentityMode,

    /// Also wake the sensor on filesystem notifications.
    #[serde(default = "default_true")]
    pub notify: bool,
}

fn default_watch_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_patterns() -> Vec<String> {
    vec!["*.csv".to_string()]
}

fn default_ledger() -> PathBuf {
    PathBuf::from("data/processed_files.txt")
}

fn default_poll_interval() -> String {
    "30s".to_string()
}

impl Default for RawSensorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            watch_dir: default_watch_dir(),
            patterns: default_patterns(),
            exclude: Vec::new(),
            ledger: default_ledger(),
            poll_interval: default_poll_interval(),
            identity: IdentityMode::default(),
            notify: true,
        }
    }
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>` (see `validate.rs`), so every
/// value here has already been checked: the cron rule parses, globs compile,
/// the poll interval is non-zero.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pipeline: PipelineSettings,
    pub runtime: RuntimeSection,
    pub schedule: ScheduleSettings,
    pub sensor: SensorSettings,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub table: String,
    pub database: PathBuf,
    pub covid_source: PathBuf,
    pub weather_source: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    pub enabled: bool,
    pub rule: CronSchedule,
}

#[derive(Debug, Clone)]
pub struct SensorSettings {
    pub enabled: bool,
    pub watch_dir: PathBuf,
    pub patterns: InputPatterns,
    pub ledger: PathBuf,
    pub poll_interval: Duration,
    pub identity: IdentityMode,
    pub notify: bool,
}

impl ConfigFile {
    /// Make every relative path absolute against `base` (the directory of
    /// the config file).
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.pipeline.database);
        resolve(&mut self.pipeline.covid_source);
        resolve(&mut self.pipeline.weather_source);
        resolve(&mut self.sensor.watch_dir);
        resolve(&mut self.sensor.ledger);
    }
}
