//! Integration tests for logging functionality
//!
//! The global subscriber can only be installed once per process, so a single
//! test initializes it.

use std::time::Duration;
use sunat_cpe::config::LoggingConfig;
use sunat_cpe::domain::{CpeError, Stage, TransmissionError};
use sunat_cpe::logging::{init_logging, parse_log_level, LOG_FILE_NAME};
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_path, "logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_invalid_level_rejected() {
    assert!(parse_log_level("verbose").is_err());
    assert!(parse_log_level("WARN").is_ok());
}

#[test]
fn test_file_logging_writes_json() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    let guard = init_logging("debug", &config).unwrap();

    let error = CpeError::from(TransmissionError::Timeout("60s".to_string()));
    sunat_cpe::log_stage_complete!(Stage::Signing, "20123456789-01-F001-1", Duration::from_millis(12));
    sunat_cpe::log_error_with_context!(&error, "20123456789-01-F001-1");
    sunat_cpe::log_retry_attempt!(1, 3, "connection refused");

    drop(guard);

    // Events from this test crate fall outside the `sunat_cpe` filter; the
    // library's own initialization event must be in the file.
    let contents = std::fs::read_to_string(log_path.join(LOG_FILE_NAME)).unwrap();
    assert!(contents.contains("Logging initialized"));
    assert!(contents.contains("\"local_enabled\":true"));
}
