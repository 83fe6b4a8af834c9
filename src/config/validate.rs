// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    ConfigFile, PipelineSettings, RawConfigFile, RawSensorSection, ScheduleSettings,
    SensorSettings,
};
use crate::errors::{PipelineError, Result};
use crate::store::is_plain_identifier;
use crate::trigger::{CronSchedule, InputPatterns};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_pipeline(&raw)?;
        validate_runtime(&raw)?;

        let rule = CronSchedule::parse(&raw.schedule.cron)?;
        let sensor = validate_sensor(&raw.sensor)?;

        let pipeline = raw.pipeline;
        Ok(ConfigFile {
            pipeline: PipelineSettings {
                table: pipeline.table,
                database: pipeline.database,
                covid_source: pipeline.covid_source,
                weather_source: pipeline.weather_source,
            },
            runtime: raw.runtime,
            schedule: ScheduleSettings {
                enabled: raw.schedule.enabled,
                rule,
            },
            sensor,
        })
    }
}

fn validate_pipeline(cfg: &RawConfigFile) -> Result<()> {
    if !is_plain_identifier(&cfg.pipeline.table) {
        return Err(PipelineError::Config(format!(
            "[pipeline].table must be a plain identifier (letters, digits, '_'), got '{}'",
            cfg.pipeline.table
        )));
    }
    Ok(())
}

fn validate_runtime(cfg: &RawConfigFile) -> Result<()> {
    // triggered_while_running_behaviour is strongly typed and validated
    // during deserialization.
    if cfg.runtime.queue_length == 0 {
        return Err(PipelineError::Config(
            "[runtime].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_sensor(raw: &RawSensorSection) -> Result<SensorSettings> {
    if raw.patterns.is_empty() {
        return Err(PipelineError::Config(
            "[sensor].patterns must contain at least one glob".to_string(),
        ));
    }

    let patterns = InputPatterns::new(&raw.patterns, &raw.exclude)
        .map_err(|e| PipelineError::Config(format!("[sensor]: {e:#}")))?;

    let poll_interval = parse_duration(&raw.poll_interval)
        .map_err(|e| PipelineError::Config(format!("[sensor].poll_interval: {e}")))?;
    if poll_interval.is_zero() {
        return Err(PipelineError::Config(
            "[sensor].poll_interval must be greater than zero".to_string(),
        ));
    }

    if raw.ledger.as_os_str().is_empty() {
        return Err(PipelineError::Config(
            "[sensor].ledger must not be empty".to_string(),
        ));
    }

    Ok(SensorSettings {
        enabled: raw.enabled,
        watch_dir: raw.watch_dir.clone(),
        patterns,
        ledger: raw.ledger.clone(),
        poll_interval,
        identity: raw.identity,
        notify: raw.notify,
    })
}

/// Parse a simple duration string like `"500ms"`, `"30s"`, `"5m"`, `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
