//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted file logs
//! - Configurable log levels
//! - Local file logging with daily or hourly rotation
//!
//! Pipeline code logs through `tracing` with the fields `natural_key`,
//! `stage`, `code` and `attempt` so a submission can be followed across
//! stages.
//!
//! # Example
//!
//! ```no_run
//! use sunat_cpe::logging::init_logging;
//! use sunat_cpe::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(natural_key = "20123456789-01-F001-1", "Submission started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, parse_log_level, LoggingGuard, LOG_FILE_NAME};

/// Log the completion of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use sunat_cpe::log_stage_complete;
/// use sunat_cpe::domain::Stage;
/// use std::time::Duration;
///
/// let key = "20123456789-01-F001-1";
/// log_stage_complete!(Stage::Signing, key, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_stage_complete {
    ($stage:expr, $natural_key:expr, $duration:expr) => {
        tracing::info!(
            stage = %$stage,
            natural_key = %$natural_key,
            duration_ms = $duration.as_millis() as u64,
            "Stage completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use sunat_cpe::log_error_with_context;
/// use sunat_cpe::domain::CpeError;
///
/// let error = CpeError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            stage = %$error.stage(),
            code = $error.code(),
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use sunat_cpe::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection refused");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::{CpeError, Stage};
    use std::time::Duration;

    #[test]
    fn test_macros_expand() {
        let error = CpeError::Configuration("missing endpoint".to_string());
        crate::log_error_with_context!(&error, "loading configuration");
        crate::log_stage_complete!(Stage::Build, "20123456789-01-F001-1", Duration::from_millis(3));
        crate::log_retry_attempt!(1, 3, "connection refused");
    }
}
