#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use stagedag::config::{ConfigFile, RawConfigFile};
use stagedag::dag::StageRegistry;
use stagedag::errors::FetchError;
use stagedag::source::TableSource;
use stagedag::table::Table;
use stagedag::types::{IdentityMode, TriggerWhileRunningBehaviour};

/// Confirmed-cases sample: two provinces of Canada are summed into one
/// country column.
pub const COVID_CSV: &str = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20
,Afghanistan,33.0,65.0,0,1,2
Ontario,Canada,51.2,-85.3,1,2,3
Quebec,Canada,52.9,-73.5,0,1,1
";

/// Hourly precipitation sample: one unparseable date, one date with no
/// matching case counts.
pub const WEATHER_CSV: &str = "\
STATION,DATE,HPCP
COOP:310301,20200122 01:00,0.2
COOP:310301,20200123 02:00,0.1
COOP:310301,not-a-date,9.9
COOP:310301,20200125 03:00,0.4
";

/// Write `contents` to `dir/name` and return the full path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write fixture file");
    path
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    /// Point every path of the config into `dir`, using the file names of
    /// the defaults.
    pub fn rooted_at(mut self, dir: &Path) -> Self {
        let p = &mut self.config.pipeline;
        p.database = dir.join("pipeline.db");
        p.covid_source = dir.join("covid.csv");
        p.weather_source = dir.join("weather.csv");
        self.config.sensor.watch_dir = dir.to_path_buf();
        self.config.sensor.ledger = dir.join("processed_files.txt");
        self
    }

    pub fn table(mut self, name: &str) -> Self {
        self.config.pipeline.table = name.to_string();
        self
    }

    pub fn cron(mut self, rule: &str) -> Self {
        self.config.schedule.cron = rule.to_string();
        self
    }

    pub fn while_running(mut self, behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        self.config.runtime.triggered_while_running_behaviour = behaviour;
        self.config.runtime.queue_length = queue_length;
        self
    }

    pub fn patterns(mut self, patterns: &[&str]) -> Self {
        self.config.sensor.patterns = patterns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.sensor.exclude.push(pattern.to_string());
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.sensor.poll_interval = interval.to_string();
        self
    }

    pub fn identity(mut self, mode: IdentityMode) -> Self {
        self.config.sensor.identity = mode;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of `String`-valued stages for graph and executor tests.
///
/// Each stage appends its name to `log` when invoked and outputs
/// `name(dep1,dep2,...)` built from its inputs.
pub fn recording_registry(
    stages: &[(&str, &[&str])],
    log: Arc<Mutex<Vec<String>>>,
) -> StageRegistry<String> {
    let mut builder = StageRegistry::<String>::builder();
    for (name, deps) in stages {
        let log = Arc::clone(&log);
        let own = name.to_string();
        let dep_names: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
        builder = builder.stage(*name, deps, move |inputs| {
            log.lock().unwrap().push(own.clone());
            let mut parts = Vec::new();
            for dep in &dep_names {
                parts.push(inputs.get(dep)?.clone());
            }
            Ok(Some(format!("{own}({})", parts.join(","))))
        });
    }
    builder.build().expect("recording registry has duplicate stages")
}

/// A source that hands out a fixed table, or fails as malformed.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    table: Option<Table>,
}

impl StaticSource {
    pub fn new(name: &str, table: Table) -> Self {
        Self {
            name: name.to_string(),
            table: Some(table),
        }
    }

    pub fn from_csv(name: &str, csv: &str) -> Self {
        let table = Table::from_csv_reader(csv.as_bytes()).expect("fixture CSV must parse");
        Self::new(name, table)
    }

    pub fn malformed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: None,
        }
    }
}

impl TableSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Table, FetchError> {
        self.table.clone().ok_or_else(|| FetchError::Malformed {
            source_name: self.name.clone(),
            reason: "static source configured to fail".to_string(),
        })
    }
}
