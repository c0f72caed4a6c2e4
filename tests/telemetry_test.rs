//! Telemetry module tests for the frame pool.

use frame_pool::telemetry::{
    init_logging, init_metrics, record_dispatch, record_item_failure, record_throttling_ratio,
    record_worker_count, FrameSpan, LogConfig, LogError, LogFormat, SpanExt, DISPATCH_TOTAL,
    ITEM_FAILURES_TOTAL, WORKERS,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Span;

// =============================================================================
// LogConfig Tests
// =============================================================================

#[test]
fn log_config_default_is_json() {
    let config = LogConfig::default();
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, "info");
    assert!(config.output_path.is_none());
    assert!(config.thread_names);
}

#[test]
fn log_config_with_output_path() {
    let config = LogConfig {
        format: LogFormat::Json,
        level: "frame_pool=trace".to_string(),
        output_path: Some(PathBuf::from("/tmp/frame-pool.log")),
        thread_names: false,
    };
    assert_eq!(config.output_path, Some(PathBuf::from("/tmp/frame-pool.log")));
    assert!(!config.thread_names);
}

#[test]
fn log_format_parses_case_insensitively() {
    assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    assert_eq!(LogFormat::Pretty.as_str(), "pretty");
}

#[test]
fn log_format_rejects_unknown() {
    let err = "xml".parse::<LogFormat>().unwrap_err();
    assert!(matches!(err, LogError::UnknownFormat(ref f) if f == "xml"));
}

// =============================================================================
// LogError Tests
// =============================================================================

#[test]
fn log_error_invalid_filter_display() {
    let error = LogError::InvalidFilter("bad filter".to_string());
    assert!(error.to_string().contains("Invalid log filter"));
    assert!(error.to_string().contains("bad filter"));
}

#[test]
fn log_error_file_open_display() {
    let error = LogError::FileOpen("permission denied".to_string());
    assert!(error.to_string().contains("Failed to open log file"));
}

#[test]
fn log_error_already_initialized_display() {
    let error = LogError::AlreadyInitialized;
    assert_eq!(error.to_string(), "Subscriber already initialized");
}

#[test]
fn pretty_logging_honours_output_path() {
    // An unwritable path fails before any global subscriber is installed.
    let config = LogConfig {
        format: LogFormat::Pretty,
        output_path: Some(PathBuf::from("/nonexistent-dir/frame-pool/pretty.log")),
        ..Default::default()
    };
    let err = init_logging(&config).unwrap_err();
    assert!(matches!(err, LogError::FileOpen(_)));
}

#[test]
fn json_logging_honours_output_path() {
    let config = LogConfig {
        output_path: Some(PathBuf::from("/nonexistent-dir/frame-pool/json.log")),
        ..Default::default()
    };
    assert!(matches!(init_logging(&config), Err(LogError::FileOpen(_))));
}

// =============================================================================
// Span Tests
// =============================================================================

#[test]
fn frame_span_accepts_late_fields() {
    let span = FrameSpan::new(4);
    span.record("frame", 7u64);
    span.record("items", 100usize);
    span.record("latency_ms", 1.5f64);
}

#[test]
fn span_ext_records_ok_result() {
    let span = FrameSpan::new(2);
    let result: Result<(), String> = Ok(());
    span.record_result(&result);
}

#[test]
fn span_ext_records_error_result() {
    let span = Span::none();
    let result: Result<(), String> = Err("no workers".to_string());
    span.record_result(&result);
}

// =============================================================================
// Metrics Tests
// =============================================================================

#[test]
fn metric_names_are_prefixed() {
    for name in [DISPATCH_TOTAL, ITEM_FAILURES_TOTAL, WORKERS] {
        assert!(name.starts_with("frame_pool_"), "{}", name);
    }
}

#[test]
fn metrics_without_recorder_are_noops() {
    init_metrics();
    record_dispatch(100, Duration::from_millis(3));
    record_item_failure("error");
    record_item_failure("panic");
    record_worker_count(4);
    record_throttling_ratio(0.5);
}
