//! Integration tests for the logger system
//!
//! These tests verify:
//! - Rotation through a registry-created logger
//! - Level filtering, pattern changes and the void formatter
//! - Drop semantics and re-creation
//! - Async delivery, flush and error reporting
//! - The boundary handle surface

use named_logger::handle::LoggerHandle;
use named_logger::prelude::*;
use parking_lot::Mutex;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Sink that records every text it receives
#[derive(Clone, Default)]
struct CaptureSink {
    texts: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    fn texts(&self) -> Vec<String> {
        self.texts.lock().clone()
    }
}

impl Sink for CaptureSink {
    fn write(&mut self, _record: &LogRecord, formatted: &FormattedRecord) -> Result<()> {
        self.texts.lock().push(formatted.text.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "capture"
    }
}

fn log_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// 29 characters plus the trailing newline: 30 bytes per record
fn thirty_byte_message(tag: char) -> String {
    std::iter::repeat(tag).take(29).collect()
}

#[test]
fn test_rotation_scenario() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let registry = Registry::new();
    let logger = registry
        .rotating("app", temp_dir.path().join("app.log"), 100, 3)
        .expect("Failed to create logger");
    logger.set_pattern("%v").unwrap();

    for tag in ['a', 'b', 'c'] {
        logger.info(thirty_byte_message(tag)).unwrap();
    }
    logger.flush().unwrap();
    assert_eq!(log_files(temp_dir.path()), vec!["app.log"]);

    logger.info(thirty_byte_message('d')).unwrap();
    logger.info(thirty_byte_message('e')).unwrap();
    logger.flush().unwrap();

    assert_eq!(log_files(temp_dir.path()), vec!["app.1.log", "app.log"]);

    let active = fs::read_to_string(temp_dir.path().join("app.log")).unwrap();
    assert_eq!(
        active,
        format!("{}\n{}\n", thirty_byte_message('d'), thirty_byte_message('e'))
    );

    let previous = fs::read_to_string(temp_dir.path().join("app.1.log")).unwrap();
    assert_eq!(previous.len(), 90);
    assert!(previous.starts_with(&thirty_byte_message('a')));
}

#[test]
fn test_rotation_window_never_exceeds_max_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let registry = Registry::new();
    let logger = registry
        .rotating("window", temp_dir.path().join("window.log"), 64, 3)
        .unwrap();
    logger.set_pattern("%v").unwrap();

    for i in 0..200 {
        logger.info(format!("record number {:05}", i)).unwrap();
        assert!(log_files(temp_dir.path()).len() <= 3);
    }
    logger.flush().unwrap();

    assert_eq!(
        log_files(temp_dir.path()),
        vec!["window.1.log", "window.2.log", "window.log"]
    );
    let newest = fs::read_to_string(temp_dir.path().join("window.log")).unwrap();
    assert!(newest.ends_with("record number 00199\n"));
}

#[test]
fn test_async_rotating_logger_flush() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let registry = Registry::new();
    let logger = registry
        .rotating_async("async", temp_dir.path().join("async.log"), 1024 * 1024, 2)
        .unwrap();
    assert!(logger.is_async());
    logger.set_pattern("%v").unwrap();

    for i in 0..1000 {
        logger.info(format!("line {}", i)).unwrap();
    }
    logger.flush().unwrap();

    let content = fs::read_to_string(temp_dir.path().join("async.log")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1000);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!("line {}", i));
    }
}

#[test]
fn test_level_threshold_filters_lower_levels() {
    let capture = CaptureSink::default();
    let logger = Logger::builder()
        .sink(capture.clone())
        .pattern("%l")
        .build("levels")
        .unwrap();

    for (index, threshold) in LogLevel::ALL.iter().enumerate() {
        logger.set_level(*threshold);
        capture.texts.lock().clear();

        for level in &LogLevel::ALL[..6] {
            logger.log(*level, "x").unwrap();
        }

        let expected: Vec<String> = LogLevel::ALL[index.min(6)..6]
            .iter()
            .map(|level| format!("{}\n", level))
            .collect();
        assert_eq!(capture.texts(), expected, "threshold {}", threshold);
    }
}

#[test]
fn test_clear_formatter_delivers_empty_text() {
    let capture = CaptureSink::default();
    let logger = Logger::builder().sink(capture.clone()).build("raw").unwrap();

    logger.clear_formatter();
    logger.warn("should not appear").unwrap();
    logger.critical("nor this").unwrap();

    assert_eq!(capture.texts(), vec![String::new(), String::new()]);
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let capture = CaptureSink::default();
    let logger = Logger::builder()
        .sink(capture.clone())
        .pattern("%n: %v")
        .build("pattern")
        .unwrap();

    for bad in ["%", "abc %", "%k", "[%Y-%m-%Q]"] {
        let err = logger.set_pattern(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "pattern {:?}", bad);
    }

    logger.info("unchanged").unwrap();
    assert_eq!(capture.texts(), vec!["pattern: unchanged\n"]);
}

#[test]
fn test_drop_then_recreate() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("dropped.log");
    let registry = Registry::new();

    let first = registry.rotating("dropped", &path, 1024, 2).unwrap();
    first.set_pattern("%v").unwrap();
    first.info("before drop").unwrap();
    first.drop_logger();

    assert!(first.info("after drop").is_ok());
    assert!(first.flush().is_ok());
    assert!(!registry.contains("dropped"));

    let second = registry.rotating("dropped", &path, 1024, 2).unwrap();
    assert!(!second.ptr_eq(&first));
    second.set_pattern("%v").unwrap();
    second.info("second instance").unwrap();
    second.flush().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "before drop\nsecond instance\n");
}

#[test]
fn test_async_write_errors_are_reported() {
    struct BrokenSink;

    impl Sink for BrokenSink {
        fn write(&mut self, _record: &LogRecord, _formatted: &FormattedRecord) -> Result<()> {
            Err(LoggerError::io_operation(
                "writing",
                "broken",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ))
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink_reports = Arc::clone(&reported);
    let logger = Logger::builder()
        .sink(BrokenSink)
        .async_mode(8)
        .error_handler(Arc::new(move |e: &LoggerError| {
            sink_reports.lock().push(e.kind());
        }))
        .build("broken")
        .unwrap();

    // The producer never sees the failure
    assert!(logger.error("first").is_ok());
    assert!(logger.error("second").is_ok());
    logger.flush().unwrap();

    assert_eq!(*reported.lock(), vec![ErrorKind::IoFailure, ErrorKind::IoFailure]);
    assert_eq!(logger.take_errors().len(), 2);
    assert_eq!(logger.metrics().write_failures(), 2);
}

#[test]
fn test_flush_threshold_flushes_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("threshold.log");
    let registry = Registry::new();
    let logger = registry.rotating("threshold", &path, 1024 * 1024, 2).unwrap();
    logger.set_pattern("%v").unwrap();

    registry.set_flush_threshold(LogLevel::Error);

    logger.info("buffered").unwrap();
    logger.error("flushed").unwrap();

    // No explicit flush: the error record pushed both lines to disk
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "buffered\nflushed\n");
}

#[test]
fn test_handle_surface() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let registry = Registry::new();
    let path = temp_dir.path().join("handle.log");
    let args = [
        json!("handle"),
        json!(path.to_str().unwrap()),
        json!(100),
        json!(3),
    ];

    let handle = LoggerHandle::create_in(&registry, "rotating", &args).unwrap();
    assert_eq!(handle.get_level(), Some(2));

    let err = handle.set_level(10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(handle.get_level(), Some(2));

    handle.set_pattern("%v").unwrap();
    for tag in ['a', 'b', 'c', 'd', 'e'] {
        handle.info(&thirty_byte_message(tag)).unwrap();
    }
    handle.flush().unwrap();
    assert_eq!(log_files(temp_dir.path()), vec!["handle.1.log", "handle.log"]);

    handle.drop_logger().unwrap().info("ignored").unwrap();
    assert_eq!(handle.get_level(), None);

    let missing = LoggerHandle::create_in(&registry, "rotating", &args[..2]);
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::InvalidArgument);

    let unknown = LoggerHandle::create_in(&registry, "syslog", &args);
    assert_eq!(unknown.unwrap_err().kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_logger_spec_open() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let registry = Registry::new();
    let json = format!(
        r#"{{"kind": "rotating", "name": "from-json", "file_path": {}, "max_bytes": 512, "max_files": 2}}"#,
        serde_json::to_string(&temp_dir.path().join("json.log")).unwrap()
    );

    let spec = LoggerSpec::from_json(&json).unwrap();
    assert_eq!(spec.kind(), LoggerKind::Rotating);

    let logger = spec.open(&registry).unwrap();
    assert_eq!(logger.name(), "from-json");
    assert!(!logger.is_async());
    assert!(spec.open(&registry).unwrap().ptr_eq(&logger));
}

#[test]
fn test_try_get_unknown_name() {
    let registry = Registry::new();
    let err = registry.try_get("nobody").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
