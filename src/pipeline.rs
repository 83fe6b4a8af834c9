// src/pipeline.rs

//! The case-count / weather pipeline:
//!
//! ```text
//! covid_data ──┐
//!              ├─> joined_data ──> persist_to_db
//! weather_data ┘
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::ConfigFile;
use crate::dag::{Pipeline, StageRegistry};
use crate::errors::{RegistrationError, Result};
use crate::source::{CsvFileSource, TableSource};
use crate::store::{SqliteSink, TableSink};
use crate::table::{inner_join, normalize_covid, normalize_weather, Table};

pub const COVID_STAGE: &str = "covid_data";
pub const WEATHER_STAGE: &str = "weather_data";
pub const JOIN_STAGE: &str = "joined_data";
pub const PERSIST_STAGE: &str = "persist_to_db";

/// Raw inputs of the two fetch stages.
#[derive(Debug, Clone)]
pub struct PipelineSources {
    pub covid: Arc<dyn TableSource>,
    pub weather: Arc<dyn TableSource>,
}

/// Register the four stages against the given collaborators.
pub fn covid_weather_registry(
    sources: PipelineSources,
    sink: Arc<dyn TableSink>,
    table_name: impl Into<String>,
) -> std::result::Result<StageRegistry<Table>, RegistrationError> {
    let table_name = table_name.into();
    let PipelineSources { covid, weather } = sources;

    StageRegistry::<Table>::builder()
        .stage(COVID_STAGE, &[], move |_| {
            let raw = covid.fetch()?;
            Ok(Some(normalize_covid(&raw)?))
        })
        .stage(WEATHER_STAGE, &[], move |_| {
            let raw = weather.fetch()?;
            Ok(Some(normalize_weather(&raw)?))
        })
        .stage(JOIN_STAGE, &[COVID_STAGE, WEATHER_STAGE], |inputs| {
            let covid = inputs.get(COVID_STAGE)?;
            let weather = inputs.get(WEATHER_STAGE)?;
            Ok(Some(inner_join(covid, weather, "timestamp", "date")?))
        })
        .stage(PERSIST_STAGE, &[JOIN_STAGE], move |inputs| {
            let joined = inputs.get(JOIN_STAGE)?;
            sink.replace(&table_name, joined)?;
            info!(table = %table_name, rows = joined.len(), "persisted joined data");
            Ok(None)
        })
        .build()
}

/// Assemble the pipeline described by `config`: CSV sources and the SQLite
/// sink, resolved and ready to run.
pub fn from_config(config: &ConfigFile) -> Result<Pipeline<Table>> {
    let settings = &config.pipeline;
    let sink: Arc<dyn TableSink> = Arc::new(SqliteSink::open(&settings.database)?);

    let registry = covid_weather_registry(sources_from_config(config), sink, settings.table.clone())?;
    Ok(Pipeline::new(registry)?)
}

/// CSV sources named by `[pipeline]`.
pub fn sources_from_config(config: &ConfigFile) -> PipelineSources {
    let settings = &config.pipeline;
    PipelineSources {
        covid: Arc::new(CsvFileSource::new(COVID_STAGE, &settings.covid_source)),
        weather: Arc::new(CsvFileSource::new(WEATHER_STAGE, &settings.weather_source)),
    }
}
