//! End-to-end tests: source files -> build -> index file -> lookup.

use chrono::{TimeZone, Utc};
use mitu::{
    sanitize_digits, BuildConfig, Error, IndexWriter, Ingestor, LookupResult, PhoneIndex,
    TimeFormat,
};
use std::fs;
use std::path::Path;

const MASTERLIST: &str = "\
# Canonical list
1212|New York, NY
1907|Alaska
44|UK-generic
49|Germany
";

const CUSTOM: &str = "\
4420|London
44|United Kingdom
4930|Berlin
";

const TIMEZONES: &str = "\
1212|America/New_York
1907|America/Anchorage&America/Adak
44|Europe/London
49|Europe/Berlin
";

const CONFIG: &str = "\
output: out.db
sources:
  - { path: 1.txt, kind: masterlist }
  - { path: custom.txt, kind: geocoding }
  - { path: map_data.txt, kind: timezone }
  - { path: custom_tz.txt, kind: timezone }
";

/// Write the sample sources and config into `dir` and build the index.
fn build_sample(dir: &Path) -> BuildConfig {
    fs::write(dir.join("1.txt"), MASTERLIST).unwrap();
    fs::write(dir.join("custom.txt"), CUSTOM).unwrap();
    fs::write(dir.join("map_data.txt"), TIMEZONES).unwrap();
    // custom_tz.txt is intentionally missing
    fs::write(dir.join("build.yaml"), CONFIG).unwrap();

    let config = BuildConfig::load(&dir.join("build.yaml")).unwrap();
    let trie = Ingestor::run(&config).unwrap();
    IndexWriter::new().write_to(&trie, &config.output).unwrap();
    config
}

#[test]
fn test_build_and_lookup_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_sample(dir.path());
    assert_eq!(config.output, dir.path().join("out.db"));

    let index = PhoneIndex::open(&config.output).unwrap();

    let result = index.lookup(&sanitize_digits("+1 (212) 555-0100"));
    let location = result.location().unwrap();
    assert_eq!(location.display_location().as_deref(), Some("New York, NY"));
    assert_eq!(location.timezone, Some("America/New_York"));
    assert_eq!(location.zone, Some(chrono_tz::America::New_York));

    // A later source overrides the state; the bare value under 44 is a city
    let result = index.lookup("442071838750");
    let location = result.location().unwrap();
    assert_eq!(location.city, Some("London"));
    assert_eq!(location.state, Some("United Kingdom"));
    assert_eq!(location.timezone, Some("Europe/London"));

    // Only the first zone alternative is kept
    let result = index.lookup("19075551234");
    assert_eq!(result.location().unwrap().timezone, Some("America/Anchorage"));

    assert_eq!(index.lookup("999"), LookupResult::NotFound);
    assert_eq!(
        index.lookup("1234567890123456"),
        LookupResult::InvalidInput { digits: 16 }
    );
}

#[test]
fn test_local_time_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_sample(dir.path());
    let index = PhoneIndex::open(&config.output).unwrap();

    let now = Utc.with_ymd_and_hms(2024, 1, 15, 17, 5, 0).unwrap();
    let result = index.lookup("4930123456");
    let location = result.location().unwrap();

    assert_eq!(location.city, Some("Berlin"));
    assert_eq!(
        location.local_time(now, TimeFormat::H24).as_deref(),
        Some("18:05")
    );
    assert_eq!(
        location.local_time(now, TimeFormat::H12).as_deref(),
        Some("06:05 PM")
    );
}

#[test]
fn test_json_serialization() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_sample(dir.path());
    let index = PhoneIndex::open(&config.output).unwrap();

    let found = serde_json::to_value(index.lookup("12125550100")).unwrap();
    assert_eq!(
        found,
        serde_json::json!({
            "status": "found",
            "city": "New York",
            "state": "NY",
            "timezone": "America/New_York",
        })
    );

    let missing = serde_json::to_value(index.lookup("999")).unwrap();
    assert_eq!(missing, serde_json::json!({ "status": "not_found" }));

    let invalid = serde_json::to_value(index.lookup("1234567890123456")).unwrap();
    assert_eq!(
        invalid,
        serde_json::json!({ "status": "invalid_input", "digits": 16 })
    );
}

#[test]
fn test_rebuild_replaces_index() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_sample(dir.path());

    fs::write(dir.path().join("custom_tz.txt"), "1212|America/Chicago\n").unwrap();
    let trie = Ingestor::run(&config).unwrap();
    IndexWriter::new().write_to(&trie, &config.output).unwrap();

    let index = PhoneIndex::open(&config.output).unwrap();
    assert_eq!(
        index.lookup("12125550100").location().unwrap().timezone,
        Some("America/Chicago")
    );

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_corrupted_file_is_unusable() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_sample(dir.path());

    let mut data = fs::read(&config.output).unwrap();
    let last = data.len() - 1;
    data[last] ^= 0x5A;
    fs::write(&config.output, &data).unwrap();

    let err = PhoneIndex::open(&config.output).unwrap_err();
    assert!(err.is_integrity());
    assert!(matches!(err, Error::IndexUnusable(_)));
}

#[test]
fn test_missing_and_empty_files_are_io_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = PhoneIndex::open(&dir.path().join("absent.db")).unwrap_err();
    assert!(matches!(missing, Error::Io(_)));

    let empty = dir.path().join("empty.db");
    fs::write(&empty, b"").unwrap();
    let err = PhoneIndex::open(&empty).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_integrity());
}

#[test]
fn test_index_is_shareable_across_threads() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_sample(dir.path());
    let index = std::sync::Arc::new(PhoneIndex::open(&config.output).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let index = index.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    let result = index.lookup("442071838750");
                    assert_eq!(result.location().unwrap().city, Some("London"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
