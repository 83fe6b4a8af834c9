// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};

/// Environment variable that overrides `[pipeline].database`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, validate it, resolve relative paths
/// against the file's directory and apply the `DATABASE_URL` override.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let database_url = std::env::var(DATABASE_URL_ENV).ok();
    load_with_database_url(path, database_url.as_deref())
}

/// [`load_and_validate`] with the `DATABASE_URL` value passed explicitly.
pub fn load_with_database_url(
    path: impl AsRef<Path>,
    database_url: Option<&str>,
) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let mut config = ConfigFile::try_from(raw_config)?;

    config.resolve_paths(&config_root_dir(path));

    if let Some(url) = database_url.filter(|u| !u.trim().is_empty()) {
        let database = database_path_from_url(url)?;
        debug!(?database, "database overridden by {DATABASE_URL_ENV}");
        config.pipeline.database = database;
    }

    Ok(config)
}

/// Accept `sqlite:///relative/path`, `sqlite:////absolute/path` or a plain
/// filesystem path.
pub fn database_path_from_url(url: &str) -> Result<PathBuf> {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("sqlite:///") {
        if rest.is_empty() {
            return Err(PipelineError::Config(format!(
                "{DATABASE_URL_ENV} '{url}' names no database file"
            )));
        }
        return Ok(PathBuf::from(rest));
    }
    if url.contains("://") {
        return Err(PipelineError::Config(format!(
            "{DATABASE_URL_ENV} '{url}' is not a sqlite:/// URL"
        )));
    }
    Ok(PathBuf::from(url))
}

/// Directory that relative paths in the config are resolved against.
///
/// A bare filename like "Pipeline.toml" (parent = "") resolves against the
/// current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Default config path: `Pipeline.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Pipeline.toml")
}
