//! Integration tests for logging system

use core_runtime::logging::{init_logging, LogEntry, LogFormat, LogLevel, LoggerSink, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl LoggerSink for CollectingSink {
    fn log(&self, entry: LogEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

#[test]
fn test_logging_config_from_verbosity() {
    // Note: We can only initialize once per process, so most checks stay on the builder
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_verbosity(2, false)
        .with_spans(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Debug);
    assert!(config.enable_spans);

    let quiet = LoggingConfig::default().with_verbosity(3, true);
    assert_eq!(quiet.level, LogLevel::Error);
}

#[test]
fn test_log_entry_builder() {
    let entry = LogEntry::new(LogLevel::Warn, "core_metadata", "bad frame")
        .with_field("frame", "TXXX")
        .with_field("size", "12");

    assert_eq!(entry.level, LogLevel::Warn);
    assert_eq!(entry.target, "core_metadata");
    assert_eq!(entry.fields.len(), 2);
    assert!(entry.span_id.is_none());
}

#[test]
fn test_log_entry_serializes() {
    let entry = LogEntry::new(LogLevel::Info, "core_playback", "device opened");
    let json = serde_json::to_string(&entry).unwrap();
    assert!(json.contains("\"level\":\"info\""));

    let back: LogEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn test_init_forwards_to_sink_and_rejects_second_init() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).expect("first initialization succeeds");

    tracing::info!(target: "core_playback::output", driver = "test", "device opened");

    {
        let entries = sink.entries.lock().unwrap();
        let entry = entries
            .iter()
            .find(|e| e.message == "device opened")
            .expect("event reached the sink");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.fields.get("driver"), Some(&"test".to_string()));
    }

    let again = init_logging(LoggingConfig::default());
    assert!(matches!(again, Err(Error::AlreadyInitialized)));
}
