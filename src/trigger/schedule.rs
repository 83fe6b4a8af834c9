// src/trigger/schedule.rs

//! Time-based trigger: a five-field cron rule evaluated in UTC.
//!
//! ```text
//! ┌─ minute        0-59
//! │ ┌─ hour        0-23
//! │ │ ┌─ day       1-31
//! │ │ │ ┌─ month   1-12 or JAN-DEC
//! │ │ │ │ ┌─ weekday 0-7 or SUN-SAT (0 and 7 are Sunday)
//! 0 0 * * *
//! ```
//!
//! Each field accepts `*`, `n`, `a-b`, `*/s`, `a-b/s`, `a/s` and
//! comma-separated lists of those. When both day fields are restricted, a
//! day matches if either does (the usual cron rule).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};

use crate::engine::TriggerReason;
use crate::errors::ScheduleError;
use crate::trigger::decision::TriggerDecision;

const MONTH_NAMES: &[&str] = &[
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const WEEKDAY_NAMES: &[&str] = &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// How far ahead `next_after` searches before concluding the rule never
/// fires (e.g. `0 0 30 2 *`). Leap-day rules can go eight years between
/// matches across a skipped century leap year (2096 to 2104).
const SEARCH_DAYS: u32 = 366 * 8 + 1;

/// A parsed cron rule. Each field is a bit set of allowed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    source: String,
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    dom_restricted: bool,
    dow_restricted: bool,
}

struct FieldSpec {
    name: &'static str,
    min: u32,
    max: u32,
    names: Option<(&'static [&'static str], u32)>,
}

const MINUTE: FieldSpec = FieldSpec { name: "minute", min: 0, max: 59, names: None };
const HOUR: FieldSpec = FieldSpec { name: "hour", min: 0, max: 23, names: None };
const DAY_OF_MONTH: FieldSpec = FieldSpec { name: "day-of-month", min: 1, max: 31, names: None };
const MONTH: FieldSpec = FieldSpec { name: "month", min: 1, max: 12, names: Some((MONTH_NAMES, 1)) };
const DAY_OF_WEEK: FieldSpec = FieldSpec { name: "day-of-week", min: 0, max: 7, names: Some((WEEKDAY_NAMES, 0)) };

impl CronSchedule {
    pub fn parse(rule: &str) -> Result<Self, ScheduleError> {
        let source = rule.trim().to_string();
        let fail = |reason: String| ScheduleError {
            rule: source.clone(),
            reason,
        };

        let expanded = match source.to_ascii_lowercase().as_str() {
            "@yearly" | "@annually" => "0 0 1 1 *",
            "@monthly" => "0 0 1 * *",
            "@weekly" => "0 0 * * 0",
            "@daily" | "@midnight" => "0 0 * * *",
            "@hourly" => "0 * * * *",
            s if s.starts_with('@') => return Err(fail(format!("unknown macro '{s}'"))),
            _ => source.as_str(),
        }
        .to_string();

        let fields: Vec<&str> = expanded.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(fail(format!(
                "expected 5 fields (minute hour day-of-month month day-of-week), got {}",
                fields.len()
            )));
        }

        let minutes = parse_field(fields[0], &MINUTE).map_err(fail)?;
        let hours = parse_field(fields[1], &HOUR).map_err(fail)?;
        let days_of_month = parse_field(fields[2], &DAY_OF_MONTH).map_err(fail)?;
        let months = parse_field(fields[3], &MONTH).map_err(fail)?;
        let mut days_of_week = parse_field(fields[4], &DAY_OF_WEEK).map_err(fail)?;

        // 7 is another spelling of Sunday.
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week & !(1 << 7)) | 1;
        }

        Ok(Self {
            dom_restricted: !fields[2].starts_with('*'),
            dow_restricted: !fields[4].starts_with('*'),
            source,
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
        })
    }

    /// The rule as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the minute containing `at` is a scheduled point.
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        has(self.minutes, at.minute())
            && has(self.hours, at.hour())
            && self.day_matches(at.date_naive())
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        if !has(self.months, date.month()) {
            return false;
        }
        let dom = has(self.days_of_month, date.day());
        let dow = has(self.days_of_week, date.weekday().num_days_from_sunday());
        if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// The first scheduled minute strictly after `after`.
    ///
    /// Returns `None` if the rule can never fire (e.g. February 30th).
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after
            .with_second(0)?
            .with_nanosecond(0)?
            .checked_add_signed(Duration::minutes(1))?;

        let first_day = start.date_naive();
        let mut day = first_day;

        for _ in 0..SEARCH_DAYS {
            if self.day_matches(day) {
                let (h0, m0) = if day == first_day {
                    (start.hour(), start.minute())
                } else {
                    (0, 0)
                };

                for h in h0..24 {
                    if !has(self.hours, h) {
                        continue;
                    }
                    let from = if h == h0 { m0 } else { 0 };
                    if let Some(m) = (from..60).find(|&m| has(self.minutes, m)) {
                        return Some(day.and_hms_opt(h, m, 0)?.and_utc());
                    }
                }
            }
            day = day.succ_opt()?;
        }

        None
    }
}

impl FromStr for CronSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CronSchedule::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn has(bits: u64, value: u32) -> bool {
    bits & (1u64 << value) != 0
}

fn parse_field(field: &str, def: &FieldSpec) -> Result<u64, String> {
    let mut bits = 0u64;

    for part in field.split(',') {
        if part.is_empty() {
            return Err(format!("empty list item in {} field '{field}'", def.name));
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step '{step}' in {} field", def.name))?;
                if step == 0 {
                    return Err(format!("step must be >= 1 in {} field", def.name));
                }
                if step > def.max {
                    return Err(format!(
                        "step {step} exceeds {} in {} field",
                        def.max, def.name
                    ));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (lo, hi) = if range == "*" {
            (def.min, def.max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(a, def)?, parse_value(b, def)?)
        } else {
            let v = parse_value(range, def)?;
            // `a/s` means "from a to the end, every s".
            if step.is_some() { (v, def.max) } else { (v, v) }
        };

        if lo > hi {
            return Err(format!("range {lo}-{hi} is reversed in {} field", def.name));
        }

        let step = step.unwrap_or(1);
        let mut v = lo;
        while v <= hi {
            bits |= 1u64 << v;
            match v.checked_add(step) {
                Some(next) => v = next,
                None => break,
            }
        }
    }

    Ok(bits)
}

fn parse_value(raw: &str, def: &FieldSpec) -> Result<u32, String> {
    let value = match raw.parse::<u32>() {
        Ok(v) => v,
        Err(_) => {
            let named = def.names.and_then(|(names, offset)| {
                names
                    .iter()
                    .position(|n| n.eq_ignore_ascii_case(raw))
                    .map(|i| i as u32 + offset)
            });
            named.ok_or_else(|| format!("invalid value '{raw}' in {} field", def.name))?
        }
    };

    if value < def.min || value > def.max {
        return Err(format!(
            "value {value} out of range {}-{} in {} field",
            def.min, def.max, def.name
        ));
    }
    Ok(value)
}

/// Whether a run is due at `now` under `rule`.
pub fn due(rule: &CronSchedule, now: DateTime<Utc>) -> bool {
    rule.matches(now)
}

/// Schedule trigger: requests a run, with no input payload, whenever the
/// rule is due. Holds no state besides the rule.
#[derive(Debug, Clone)]
pub struct ScheduleTrigger {
    rule: CronSchedule,
}

impl ScheduleTrigger {
    pub fn new(rule: CronSchedule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &CronSchedule {
        &self.rule
    }

    pub fn evaluate(&self, now: DateTime<Utc>) -> TriggerDecision {
        if due(&self.rule, now) {
            TriggerDecision::run(TriggerReason::Schedule)
        } else {
            TriggerDecision::Skip
        }
    }

    /// Next point at which [`ScheduleTrigger::evaluate`] will request a run.
    pub fn next_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.rule.next_after(now)
    }
}
