// src/table/normalize.rs

//! Per-dataset normalization into the shared date key.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use regex::Regex;
use tracing::debug;

use super::timekey::{date_key, hour_key, parse_timestamp};
use super::Table;

pub const COUNTRY_COLUMN: &str = "Country/Region";
const COVID_DROPPED: &[&str] = &["Province/State", "Lat", "Long"];
const DATE_HEADER: &str = r"^\d{1,4}[/-]\d{1,2}[/-]\d{1,4}$";

/// Case counts: one row per region, one column per day.
///
/// Output: one row per day with `timestamp` (date key), one column per
/// country holding the summed counts, and `hour` (timestamp floored to the
/// hour). Countries appear in first-seen order.
pub fn normalize_covid(raw: &Table) -> Result<Table> {
    let mut table = raw.clone();
    table.drop_columns(COVID_DROPPED);

    let Some(country_idx) = table.column_index(COUNTRY_COLUMN) else {
        bail!("missing column '{COUNTRY_COLUMN}'");
    };

    let date_header = Regex::new(DATE_HEADER).context("compiling date header pattern")?;
    let date_columns: Vec<(usize, chrono::NaiveDateTime)> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| date_header.is_match(name))
        .filter_map(|(idx, name)| parse_timestamp(name).map(|dt| (idx, dt)))
        .collect();

    if date_columns.is_empty() {
        bail!("no date columns found");
    }

    let mut countries: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut sums: Vec<Vec<f64>> = Vec::new();

    for row in table.rows() {
        let country = row[country_idx].trim();
        let slot = *positions.entry(country.to_string()).or_insert_with(|| {
            countries.push(country.to_string());
            sums.push(vec![0.0; date_columns.len()]);
            countries.len() - 1
        });

        for (d, (idx, _)) in date_columns.iter().enumerate() {
            // Non-numeric cells contribute nothing.
            if let Ok(v) = row[*idx].trim().parse::<f64>() {
                sums[slot][d] += v;
            }
        }
    }

    let mut columns = Vec::with_capacity(countries.len() + 2);
    columns.push("timestamp".to_string());
    columns.extend(countries.iter().cloned());
    columns.push("hour".to_string());

    let mut out = Table::new(columns);
    for (d, (_, at)) in date_columns.iter().enumerate() {
        let mut row = Vec::with_capacity(out.width());
        row.push(date_key(at));
        row.extend(sums.iter().map(|per_day| format_number(per_day[d])));
        row.push(hour_key(at));
        out.push_row(row)?;
    }

    debug!(
        countries = countries.len(),
        days = date_columns.len(),
        "normalized case counts"
    );
    Ok(out)
}

/// Weather observations: `DATE` becomes `date`, rows with an unparseable
/// date are dropped, and the rest are rewritten as date keys.
pub fn normalize_weather(raw: &Table) -> Result<Table> {
    let mut table = raw.clone();
    table.rename_column("DATE", "date");

    let Some(date_idx) = table.column_index("date") else {
        bail!("missing column 'DATE' or 'date'");
    };

    let before = table.len();
    table.retain_rows(|row| parse_timestamp(&row[date_idx]).is_some());

    for row in table.rows_mut() {
        if let Some(at) = parse_timestamp(&row[date_idx]) {
            row[date_idx] = date_key(&at);
        }
    }

    debug!(
        kept = table.len(),
        dropped = before - table.len(),
        "normalized weather observations"
    );
    Ok(table)
}

/// Whole numbers print without a fractional part.
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}
