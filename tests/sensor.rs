// tests/sensor.rs

mod common;
use crate::common::init_tracing;

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use stagedag::engine::TriggerReason;
use stagedag::fs::mock::MockFileSystem;
use stagedag::fs::{FileSystem, RealFileSystem};
use stagedag::trigger::{
    check, content_identity, parse_ledger, FileLedger, InputPatterns, LedgerStore, MemoryLedger,
    Sensor, TriggerDecision,
};
use stagedag::types::IdentityMode;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn csv_patterns() -> InputPatterns {
    InputPatterns::new(&["*.csv".to_string()], &[]).unwrap()
}

fn mock_sensor(mock: &MockFileSystem, ledger: Box<dyn LedgerStore>) -> Sensor {
    Sensor::new(
        Arc::new(mock.clone()),
        "data",
        csv_patterns(),
        IdentityMode::Path,
        ledger,
    )
}

#[test]
fn check_reports_only_unseen_identifiers() {
    let detection = check(&set(&["a.csv", "b.csv"]), &set(&["a.csv"]));
    assert_eq!(detection.new, set(&["b.csv"]));
    assert_eq!(detection.ledger, set(&["a.csv", "b.csv"]));
    assert!(detection.run_requested());
}

#[test]
fn check_with_everything_seen_requests_nothing() {
    let detection = check(&set(&["a.csv"]), &set(&["a.csv", "old.csv"]));
    assert!(detection.new.is_empty());
    assert_eq!(detection.ledger, set(&["a.csv", "old.csv"]));
    assert!(!detection.run_requested());
}

#[test]
fn third_file_appearing_requests_a_run_and_grows_the_ledger() {
    let ledger = set(&["a.csv", "b.csv"]);
    let detection = check(&set(&["a.csv", "b.csv", "c.csv"]), &ledger);

    assert_eq!(detection.new, set(&["c.csv"]));
    assert_eq!(detection.ledger, set(&["a.csv", "b.csv", "c.csv"]));
}

#[test]
fn unchanged_directory_requests_nothing() {
    let ledger = set(&["a.csv", "b.csv"]);
    let detection = check(&set(&["a.csv", "b.csv"]), &ledger);

    assert!(detection.new.is_empty());
    assert_eq!(detection.ledger, ledger);
}

#[test]
fn check_keeps_ledger_entries_for_vanished_files() {
    let detection = check(&set(&[]), &set(&["gone.csv"]));
    assert!(detection.new.is_empty());
    assert_eq!(detection.ledger, set(&["gone.csv"]));
}

proptest! {
    #[test]
    fn check_is_idempotent(
        current in prop::collection::btree_set("[a-z]{1,6}", 0..12),
        ledger in prop::collection::btree_set("[a-z]{1,6}", 0..12),
    ) {
        let first = check(&current, &ledger);
        let second = check(&current, &first.ledger);
        prop_assert!(second.new.is_empty());
        prop_assert_eq!(&second.ledger, &first.ledger);
    }

    #[test]
    fn check_only_grows_the_ledger(
        current in prop::collection::btree_set("[a-z]{1,6}", 0..12),
        ledger in prop::collection::btree_set("[a-z]{1,6}", 0..12),
    ) {
        let detection = check(&current, &ledger);
        prop_assert!(ledger.is_subset(&detection.ledger));
        prop_assert!(current.is_subset(&detection.ledger));
        prop_assert!(detection.new.is_disjoint(&ledger));
        prop_assert!(detection.new.is_subset(&current));
    }
}

#[test]
fn new_file_triggers_once_then_skips() {
    init_tracing();

    let mock = MockFileSystem::new();
    mock.add_file("data/a.csv", "x,y\n1,2\n");
    mock.add_file("data/b.csv", "x,y\n3,4\n");

    let mut sensor = mock_sensor(&mock, Box::new(MemoryLedger::with_entries(["data/a.csv"])));

    match sensor.tick() {
        TriggerDecision::Run { reason, inputs } => {
            assert_eq!(reason, TriggerReason::Sensor);
            assert_eq!(inputs, set(&["data/b.csv"]));
        }
        other => panic!("expected a run request, got {other:?}"),
    }

    assert_eq!(sensor.tick(), TriggerDecision::Skip);
}

#[test]
fn nothing_new_leaves_ledger_untouched() {
    let mock = MockFileSystem::new();
    mock.add_file("data/a.csv", "1");

    let mut sensor = mock_sensor(&mock, Box::new(MemoryLedger::with_entries(["data/a.csv"])));
    let detection = sensor.try_tick().unwrap();

    assert!(!detection.run_requested());
    assert_eq!(detection.ledger, set(&["data/a.csv"]));
}

#[test]
fn non_matching_and_excluded_files_are_ignored() {
    let mock = MockFileSystem::new();
    mock.add_file("data/a.csv", "1");
    mock.add_file("data/notes.txt", "hello");
    mock.add_file("data/scratch.tmp.csv", "1");
    mock.add_dir("data/archive.csv");

    let patterns =
        InputPatterns::new(&["*.csv".to_string()], &["*.tmp.csv".to_string()]).unwrap();
    let sensor = Sensor::new(
        Arc::new(mock.clone()),
        "data",
        patterns,
        IdentityMode::Path,
        Box::new(MemoryLedger::new()),
    );

    assert_eq!(sensor.observe().unwrap(), set(&["data/a.csv"]));
}

#[test]
fn ledger_failure_skips_without_recording() {
    init_tracing();

    let mock = MockFileSystem::new();
    mock.add_file("data/a.csv", "1");
    mock.add_file("data/processed_files.txt", "");
    mock.fail_on("data/processed_files.txt");

    let ledger = FileLedger::new("data/processed_files.txt", Arc::new(mock.clone()));
    let mut sensor = mock_sensor(&mock, Box::new(ledger));

    assert_eq!(sensor.tick(), TriggerDecision::Skip);

    // Once the ledger is readable again the input is still new.
    mock.heal("data/processed_files.txt");
    assert!(sensor.tick().is_run());
    assert_eq!(
        mock.contents("data/processed_files.txt").unwrap(),
        b"data/a.csv\n".to_vec()
    );
}

#[test]
fn unreadable_watch_dir_skips() {
    let mock = MockFileSystem::new();
    mock.add_file("data/a.csv", "1");
    mock.fail_on("data");

    let mut sensor = mock_sensor(&mock, Box::new(MemoryLedger::new()));
    assert!(sensor.try_tick().is_err());
    assert_eq!(sensor.tick(), TriggerDecision::Skip);
}

#[test]
fn content_identity_treats_rewritten_file_as_new() {
    let mock = MockFileSystem::new();
    mock.add_file("data/a.csv", "v1");

    let mut sensor = Sensor::new(
        Arc::new(mock.clone()),
        "data",
        csv_patterns(),
        IdentityMode::Content,
        Box::new(MemoryLedger::new()),
    );

    let first = sensor.try_tick().unwrap();
    assert_eq!(first.new.len(), 1);
    let id = first.new.iter().next().unwrap().clone();
    assert!(id.starts_with("data/a.csv#"));
    assert_eq!(id, content_identity(&mock, "data/a.csv".as_ref()).unwrap());

    assert!(!sensor.try_tick().unwrap().run_requested());

    mock.add_file("data/a.csv", "v2");
    let third = sensor.try_tick().unwrap();
    assert_eq!(third.new.len(), 1);
    assert_ne!(third.new.iter().next(), Some(&id));
}

#[test]
fn path_identity_ignores_rewritten_file() {
    let mock = MockFileSystem::new();
    mock.add_file("data/a.csv", "v1");

    let mut sensor = mock_sensor(&mock, Box::new(MemoryLedger::new()));
    assert!(sensor.try_tick().unwrap().run_requested());

    mock.add_file("data/a.csv", "v2");
    assert!(!sensor.try_tick().unwrap().run_requested());
}

#[test]
fn file_ledger_survives_a_new_sensor_instance() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    std::fs::write(dir.path().join("cases.csv"), "a,b\n1,2\n").unwrap();
    let ledger_path = dir.path().join("state").join("processed_files.txt");

    let make_sensor = || {
        Sensor::new(
            Arc::clone(&fs),
            dir.path(),
            csv_patterns(),
            IdentityMode::Path,
            Box::new(FileLedger::new(ledger_path.clone(), Arc::clone(&fs))),
        )
    };

    let mut first = make_sensor();
    let detection = first.try_tick().unwrap();
    let expected = dir.path().join("cases.csv").display().to_string();
    assert_eq!(detection.new, set(&[expected.as_str()]));

    // A restarted process reads the same ledger and sees nothing new.
    let mut second = make_sensor();
    assert_eq!(second.tick(), TriggerDecision::Skip);

    let contents = std::fs::read_to_string(&ledger_path).unwrap();
    assert_eq!(parse_ledger(&contents), set(&[expected.as_str()]));
}

#[test]
fn parse_ledger_ignores_blank_lines_and_duplicates() {
    let parsed = parse_ledger("a.csv\n\n  \nb.csv\na.csv\n");
    assert_eq!(parsed, set(&["a.csv", "b.csv"]));
}

#[test]
fn file_ledger_rejects_identifiers_with_line_breaks() {
    let mock = MockFileSystem::new();
    let mut ledger = FileLedger::new("ledger.txt", Arc::new(mock.clone()));

    let err = ledger.record(&set(&["bad\nname"])).unwrap_err();
    assert!(err.to_string().contains("line break"));
    assert!(mock.contents("ledger.txt").is_none());
}
