// tests/config.rs

mod common;
use crate::common::builders::ConfigFileBuilder;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use stagedag::config::loader::database_path_from_url;
use stagedag::config::{load_from_path, load_with_database_url, parse_duration, ConfigFile};
use stagedag::errors::PipelineError;
use stagedag::types::{IdentityMode, TriggerWhileRunningBehaviour};
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn empty_file_gives_the_defaults() {
    let file = config_file("");
    let cfg = load_with_database_url(file.path(), None).unwrap();
    let base = file.path().parent().unwrap();

    assert_eq!(cfg.pipeline.table, "covid_weather_data");
    assert_eq!(cfg.pipeline.database, base.join("data/pipeline.db"));
    assert_eq!(cfg.sensor.watch_dir, base.join("data"));
    assert_eq!(cfg.sensor.ledger, base.join("data/processed_files.txt"));
    assert_eq!(cfg.sensor.poll_interval, Duration::from_secs(30));
    assert_eq!(cfg.sensor.patterns.include(), &["*.csv"]);
    assert_eq!(cfg.sensor.identity, IdentityMode::Path);
    assert!(cfg.sensor.enabled && cfg.sensor.notify);
    assert!(cfg.schedule.enabled);
    assert_eq!(cfg.schedule.rule.as_str(), "0 0 * * *");
    assert_eq!(
        cfg.runtime.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Queue
    );
    assert_eq!(cfg.runtime.queue_length, 1);
}

#[test]
fn full_file_is_parsed() {
    let file = config_file(
        r#"
[pipeline]
table = "daily_join"
database = "/var/lib/stagedag/out.db"
covid_source = "in/cases.csv"
weather_source = "in/precip.csv"

[runtime]
triggered_while_running_behaviour = "skip"
queue_length = 3

[schedule]
enabled = false
cron = "*/10 6-18 * * MON-FRI"

[sensor]
watch_dir = "incoming"
patterns = ["*.csv", "*.CSV"]
exclude = ["*.partial.csv"]
ledger = "state/seen.txt"
poll_interval = "500ms"
identity = "content"
notify = false
"#,
    );

    let cfg = load_with_database_url(file.path(), None).unwrap();
    let base = file.path().parent().unwrap();

    assert_eq!(cfg.pipeline.table, "daily_join");
    assert_eq!(cfg.pipeline.database, PathBuf::from("/var/lib/stagedag/out.db"));
    assert_eq!(cfg.pipeline.covid_source, base.join("in/cases.csv"));
    assert_eq!(
        cfg.runtime.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Skip
    );
    assert_eq!(cfg.runtime.queue_length, 3);
    assert!(!cfg.schedule.enabled);
    assert_eq!(cfg.schedule.rule.as_str(), "*/10 6-18 * * MON-FRI");
    assert_eq!(cfg.sensor.watch_dir, base.join("incoming"));
    assert!(cfg.sensor.patterns.matches("cases.CSV"));
    assert!(!cfg.sensor.patterns.matches("cases.partial.csv"));
    assert_eq!(cfg.sensor.ledger, base.join("state/seen.txt"));
    assert_eq!(cfg.sensor.poll_interval, Duration::from_millis(500));
    assert_eq!(cfg.sensor.identity, IdentityMode::Content);
    assert!(!cfg.sensor.notify);
}

#[test]
fn database_url_overrides_the_configured_path() {
    let file = config_file("[pipeline]\ndatabase = \"data/pipeline.db\"\n");

    let cfg = load_with_database_url(file.path(), Some("sqlite:///tmp/override.db")).unwrap();
    assert_eq!(cfg.pipeline.database, PathBuf::from("tmp/override.db"));

    let cfg = load_with_database_url(file.path(), Some("   ")).unwrap();
    assert!(cfg.pipeline.database.ends_with("data/pipeline.db"));

    match load_with_database_url(file.path(), Some("postgres://db/x")) {
        Err(PipelineError::Config(msg)) => assert!(msg.contains("sqlite:///")),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn database_urls() {
    assert_eq!(
        database_path_from_url("sqlite:///data/x.db").unwrap(),
        PathBuf::from("data/x.db")
    );
    assert_eq!(
        database_path_from_url("sqlite:////abs/x.db").unwrap(),
        PathBuf::from("/abs/x.db")
    );
    assert_eq!(
        database_path_from_url("plain/x.db").unwrap(),
        PathBuf::from("plain/x.db")
    );
    assert!(database_path_from_url("sqlite:///").is_err());
    assert!(database_path_from_url("mysql://h/db").is_err());
}

#[test]
fn zero_queue_length_is_rejected() {
    let file = config_file("[runtime]\nqueue_length = 0\n");

    match load_with_database_url(file.path(), None) {
        Err(PipelineError::Config(msg)) => assert!(msg.contains("queue_length")),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn unknown_behaviour_is_a_toml_error() {
    let file = config_file("[runtime]\ntriggered_while_running_behaviour = \"cancel\"\n");

    match load_with_database_url(file.path(), None) {
        Err(PipelineError::Toml(_)) => {}
        other => panic!("expected Toml error, got {other:?}"),
    }
}

#[test]
fn bad_cron_is_a_schedule_error() {
    let file = config_file("[schedule]\ncron = \"0 25 * * *\"\n");

    match load_with_database_url(file.path(), None) {
        Err(PipelineError::Schedule(e)) => {
            assert_eq!(e.rule, "0 25 * * *");
            assert!(e.reason.contains("hour"));
        }
        other => panic!("expected Schedule error, got {other:?}"),
    }
}

#[test]
fn sensor_settings_are_checked() {
    let cases = [
        ("[sensor]\npoll_interval = \"soon\"\n", "poll_interval"),
        ("[sensor]\npoll_interval = \"0s\"\n", "poll_interval"),
        ("[sensor]\npatterns = []\n", "patterns"),
        ("[sensor]\npatterns = [\"[\"]\n", "[sensor]"),
        ("[sensor]\nledger = \"\"\n", "ledger"),
    ];

    for (toml, needle) in cases {
        let file = config_file(toml);
        match load_with_database_url(file.path(), None) {
            Err(PipelineError::Config(msg)) => {
                assert!(msg.contains(needle), "{msg:?} should mention {needle:?}")
            }
            other => panic!("expected Config error for {toml:?}, got {other:?}"),
        }
    }
}

#[test]
fn table_name_must_be_a_plain_identifier() {
    let raw = ConfigFileBuilder::new().table("covid weather; drop").raw();

    match ConfigFile::try_from(raw) {
        Err(PipelineError::Config(msg)) => assert!(msg.contains("[pipeline].table")),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    match load_from_path(dir.path().join("absent.toml")) {
        Err(PipelineError::Io(_)) => {}
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn builder_config_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ConfigFileBuilder::new()
        .rooted_at(dir.path())
        .cron("@hourly")
        .while_running(TriggerWhileRunningBehaviour::Skip, 2)
        .patterns(&["cases_*.csv"])
        .exclude("*.tmp")
        .poll_interval("2s")
        .identity(IdentityMode::Content)
        .build();

    assert_eq!(cfg.sensor.watch_dir, dir.path());
    assert!(cfg.sensor.patterns.matches("cases_01.csv"));
    assert!(!cfg.sensor.patterns.matches("weather.csv"));
    assert_eq!(cfg.sensor.poll_interval, Duration::from_secs(2));
    assert_eq!(cfg.runtime.queue_length, 2);
}

#[test]
fn durations() {
    assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
    assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
    assert_eq!(parse_duration(" 5m ").unwrap(), Duration::from_secs(300));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert_eq!(parse_duration("2 s").unwrap(), Duration::from_secs(2));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("30").is_err());
    assert!(parse_duration("s").is_err());
    assert!(parse_duration("3d").is_err());

    assert!(parse_duration("18446744073709551615h").is_err());
    assert!(parse_duration("307445734561825861m").is_err());
    assert_eq!(
        parse_duration("18446744073709551615s").unwrap(),
        Duration::from_secs(u64::MAX)
    );
}
