// src/trigger/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled include/exclude glob patterns for sensor inputs.
///
/// Patterns are matched against paths relative to the watch directory,
/// e.g. `"cases_2020.csv"`.
#[derive(Clone)]
pub struct InputPatterns {
    include: Vec<String>,
    include_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for InputPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputPatterns")
            .field("include", &self.include)
            .finish_non_exhaustive()
    }
}

impl InputPatterns {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set =
            build_globset(include).context("building sensor include globset")?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building sensor exclude globset")?)
        };

        Ok(Self {
            include: include.to_vec(),
            include_set,
            exclude_set,
        })
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    /// Returns true if the relative path is an input of interest.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
