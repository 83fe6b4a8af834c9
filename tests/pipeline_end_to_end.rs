// tests/pipeline_end_to_end.rs

mod common;
use crate::common::builders::{write_file, ConfigFileBuilder, StaticSource, COVID_CSV, WEATHER_CSV};
use crate::common::init_tracing;

use std::sync::Arc;

use stagedag::dag::Pipeline;
use stagedag::errors::{FetchError, PipelineError};
use stagedag::pipeline::{
    covid_weather_registry, from_config, PipelineSources, COVID_STAGE, JOIN_STAGE, PERSIST_STAGE,
    WEATHER_STAGE,
};
use stagedag::source::{CsvFileSource, TableSource};
use stagedag::store::{MemorySink, SqliteSink, TableSink};

fn static_sources() -> PipelineSources {
    PipelineSources {
        covid: Arc::new(StaticSource::from_csv(COVID_STAGE, COVID_CSV)),
        weather: Arc::new(StaticSource::from_csv(WEATHER_STAGE, WEATHER_CSV)),
    }
}

#[test]
fn stages_resolve_in_the_expected_order() {
    let sink = Arc::new(MemorySink::new());
    let registry = covid_weather_registry(static_sources(), sink, "covid_weather").unwrap();
    let pipeline = Pipeline::new(registry).unwrap();

    assert_eq!(
        pipeline.order().as_slice(),
        &[COVID_STAGE, WEATHER_STAGE, JOIN_STAGE, PERSIST_STAGE]
    );
}

#[test]
fn run_persists_the_joined_table() {
    init_tracing();

    let sink = Arc::new(MemorySink::new());
    let registry =
        covid_weather_registry(static_sources(), Arc::clone(&sink) as Arc<dyn TableSink>, "covid_weather")
            .unwrap();
    let result = Pipeline::new(registry).unwrap().run().unwrap();

    assert!(result.output.is_none());
    assert_eq!(result.terminal.as_deref(), Some(PERSIST_STAGE));

    let stored = sink.get("covid_weather").unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored.column("timestamp").unwrap(), vec!["2020-01-22", "2020-01-23"]);
    assert_eq!(stored.column("Canada").unwrap(), vec!["1", "3"]);
    assert_eq!(sink.writes(), 1);
}

#[test]
fn malformed_source_fails_its_stage_and_writes_nothing() {
    init_tracing();

    let sink = Arc::new(MemorySink::new());
    let sources = PipelineSources {
        covid: Arc::new(StaticSource::malformed(COVID_STAGE)),
        weather: Arc::new(StaticSource::from_csv(WEATHER_STAGE, WEATHER_CSV)),
    };
    let registry =
        covid_weather_registry(sources, Arc::clone(&sink) as Arc<dyn TableSink>, "covid_weather").unwrap();

    let err = Pipeline::new(registry).unwrap().run().unwrap_err();
    assert_eq!(err.failed_stage(), Some(COVID_STAGE));
    assert_eq!(sink.writes(), 0);
}

#[test]
fn missing_csv_file_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let source = CsvFileSource::new("covid_data", dir.path().join("nope.csv"));

    match source.fetch() {
        Err(FetchError::Unreachable { source_name, .. }) => assert_eq!(source_name, "covid_data"),
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[test]
fn ragged_csv_file_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "bad.csv", "a,b\n1,2,3\n");

    match CsvFileSource::new("weather_data", path).fetch() {
        Err(FetchError::Malformed { source_name, .. }) => assert_eq!(source_name, "weather_data"),
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[test]
fn sqlite_sink_replaces_rather_than_appends() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "covid.csv", COVID_CSV);
    write_file(dir.path(), "weather.csv", WEATHER_CSV);

    let cfg = ConfigFileBuilder::new().rooted_at(dir.path()).build();
    let pipeline = from_config(&cfg).unwrap();

    pipeline.run().unwrap();
    pipeline.run().unwrap();

    let db = SqliteSink::open(&cfg.pipeline.database).unwrap();
    assert_eq!(db.row_count(&cfg.pipeline.table).unwrap(), Some(2));

    let stored = db.read_table(&cfg.pipeline.table).unwrap();
    assert_eq!(
        stored.columns(),
        &["timestamp", "Afghanistan", "Canada", "hour", "STATION", "date", "HPCP"]
    );
    assert_eq!(stored.column("Afghanistan").unwrap(), vec!["0", "1"]);
    assert_eq!(stored.column("HPCP").unwrap(), vec!["0.2", "0.1"]);
    assert_eq!(stored.column("hour").unwrap()[0], "2020-01-22 00:00:00");
}

#[test]
fn new_source_data_shows_up_after_the_next_run() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "covid.csv", COVID_CSV);
    write_file(dir.path(), "weather.csv", "STATION,DATE,HPCP\nCOOP:1,20200122 01:00,0.2\n");

    let cfg = ConfigFileBuilder::new()
        .rooted_at(dir.path())
        .table("daily")
        .build();
    let pipeline = from_config(&cfg).unwrap();

    pipeline.run().unwrap();
    let db = SqliteSink::open(&cfg.pipeline.database).unwrap();
    assert_eq!(db.row_count("daily").unwrap(), Some(1));

    write_file(dir.path(), "weather.csv", WEATHER_CSV);
    pipeline.run().unwrap();
    assert_eq!(db.row_count("daily").unwrap(), Some(2));
}

#[test]
fn missing_source_file_fails_without_touching_the_database() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "covid.csv", COVID_CSV);

    let cfg = ConfigFileBuilder::new().rooted_at(dir.path()).build();
    let err = from_config(&cfg).unwrap().run().unwrap_err();

    assert_eq!(err.failed_stage(), Some(WEATHER_STAGE));
    match err {
        PipelineError::StageExecution(e) => {
            assert!(e.source.downcast_ref::<FetchError>().is_some());
        }
        other => panic!("expected StageExecution, got {other:?}"),
    }

    let db = SqliteSink::open(&cfg.pipeline.database).unwrap();
    assert_eq!(db.row_count(&cfg.pipeline.table).unwrap(), None);
}

#[test]
fn sqlite_sink_rejects_bad_table_names() {
    let db = SqliteSink::in_memory().unwrap();
    let table = stagedag::table::Table::new(["a"]);

    assert!(db.replace("drop table x;", &table).is_err());
    assert!(db.replace("ok_name", &stagedag::table::Table::default()).is_err());
    db.replace("ok_name", &table).unwrap();
    assert_eq!(db.row_count("ok_name").unwrap(), Some(0));
    assert!(db.read_table("1bad").is_err());
}

#[test]
fn empty_cells_round_trip_as_empty() {
    let db = SqliteSink::in_memory().unwrap();
    let table = stagedag::table::Table::from_csv_reader("n,label\n1,\n,x\n".as_bytes()).unwrap();

    db.replace("t", &table).unwrap();
    assert_eq!(db.read_table("t").unwrap(), table);
}
