// tests/cli.rs

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use clap::Parser;
use stagedag::cli::{CliArgs, Command, LogLevel};
use stagedag::logging::parse_level_str;

#[test]
fn defaults_to_pipeline_toml() {
    let args = CliArgs::try_parse_from(["stagedag", "run"]).unwrap();
    assert_eq!(args.config, PathBuf::from("Pipeline.toml"));
    assert!(args.log_level.is_none());
    assert!(matches!(args.command, Command::Run));
}

#[test]
fn global_flags_and_subcommands() {
    let args = CliArgs::try_parse_from([
        "stagedag",
        "--config",
        "etc/pipeline.toml",
        "--log-level",
        "debug",
        "serve",
        "--once",
    ])
    .unwrap();

    assert_eq!(args.config, PathBuf::from("etc/pipeline.toml"));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(matches!(args.command, Command::Serve { once: true }));

    let args = CliArgs::try_parse_from(["stagedag", "serve"]).unwrap();
    assert!(matches!(args.command, Command::Serve { once: false }));
}

#[test]
fn due_accepts_an_rfc3339_instant() {
    let args =
        CliArgs::try_parse_from(["stagedag", "due", "--at", "2024-03-10T00:00:00Z"]).unwrap();

    match args.command {
        Command::Due { at } => {
            assert_eq!(at, Some(Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()));
        }
        other => panic!("expected due, got {other:?}"),
    }

    assert!(CliArgs::try_parse_from(["stagedag", "due", "--at", "tomorrow"]).is_err());
}

#[test]
fn subcommand_is_required() {
    assert!(CliArgs::try_parse_from(["stagedag"]).is_err());
    assert!(CliArgs::try_parse_from(["stagedag", "explode"]).is_err());
}

#[test]
fn log_env_values() {
    assert_eq!(parse_level_str(" Warning "), Some(tracing::Level::WARN));
    assert_eq!(parse_level_str("trace"), Some(tracing::Level::TRACE));
    assert_eq!(parse_level_str("loud"), None);
}
