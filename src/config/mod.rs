// src/config/mod.rs

//! Configuration loading and validation for stagedag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and apply environment overrides
//!   (`loader.rs`).
//! - Validate values and build the checked `ConfigFile` (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_with_database_url};
pub use model::{
    ConfigFile, PipelineSettings, RawConfigFile, RuntimeSection, ScheduleSettings, SensorSettings,
};
pub use validate::parse_duration;
