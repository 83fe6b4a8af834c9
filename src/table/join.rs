// src/table/join.rs

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};

use super::Table;

/// Inner join of `left.left_on == right.right_on`.
///
/// Rows come out in left order, then in right match order. Both key columns
/// are kept unless they share a name, in which case the key appears once.
/// Any other column name present on both sides gets an `_x` (left) or `_y`
/// (right) suffix.
pub fn inner_join(left: &Table, right: &Table, left_on: &str, right_on: &str) -> Result<Table> {
    let Some(lk) = left.column_index(left_on) else {
        bail!("left table has no column '{left_on}'");
    };
    let Some(rk) = right.column_index(right_on) else {
        bail!("right table has no column '{right_on}'");
    };

    let same_key = left_on == right_on;
    let right_keep: Vec<usize> = (0..right.width())
        .filter(|&i| !(same_key && i == rk))
        .collect();

    let left_names: HashSet<&str> = left.columns().iter().map(String::as_str).collect();
    let right_names: HashSet<&str> = right_keep
        .iter()
        .map(|&i| right.columns()[i].as_str())
        .collect();

    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .map(|c| {
            if right_names.contains(c.as_str()) {
                format!("{c}_x")
            } else {
                c.clone()
            }
        })
        .collect();
    columns.extend(right_keep.iter().map(|&i| {
        let c = &right.columns()[i];
        if left_names.contains(c.as_str()) {
            format!("{c}_y")
        } else {
            c.clone()
        }
    }));

    let mut by_key: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        by_key.entry(row[rk].as_str()).or_default().push(i);
    }

    let mut out = Table::new(columns);
    for lrow in left.rows() {
        let Some(matches) = by_key.get(lrow[lk].as_str()) else {
            continue;
        };
        for &ri in matches {
            let rrow = &right.rows()[ri];
            let mut row = lrow.clone();
            row.extend(right_keep.iter().map(|&i| rrow[i].clone()));
            out.push_row(row)?;
        }
    }

    Ok(out)
}
