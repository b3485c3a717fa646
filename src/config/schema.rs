//! Configuration schema types
//!
//! Every section has serde defaults for its optional settings and a
//! `validate()` that reports the first problem found as a message.

use crate::config::{secret_string, SecretString};
use crate::core::receipt::CodeComparison;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main configuration
///
/// This is the root configuration structure that maps to the TOML file. It
/// is passed explicitly to each pipeline stage; nothing reads configuration
/// from globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpeConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Billing service connection
    pub sunat: SunatConfig,

    /// Signing key material
    pub signing: SigningConfig,

    /// Artifact output
    #[serde(default)]
    pub output: OutputConfig,

    /// Receipt interpretation
    #[serde(default)]
    pub receipt: ReceiptConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CpeConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.sunat.validate(&self.environment)?;
        self.signing.validate()?;
        self.output.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (build and sign, never transmit)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Retry configuration
///
/// `max_retries` counts attempts after the first one; the default of zero
/// sends each document exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default)]
    pub max_retries: u32,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (1-based), capped at `max_delay_ms`
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let factor = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay_ms = (self.initial_delay_ms as f64 * factor) as u64;
        delay_ms.min(self.max_delay_ms)
    }

    fn validate(&self) -> Result<(), String> {
        if self.backoff_multiplier < 1.0 {
            return Err("sunat.retry.backoff_multiplier must be >= 1.0".to_string());
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(
                "sunat.retry.initial_delay_ms cannot exceed sunat.retry.max_delay_ms".to_string(),
            );
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Billing service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SunatConfig {
    /// `billService` endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Secondary user; the RUC is prepended when authenticating
    pub username: String,

    /// Password of the secondary user
    /// Stored securely in memory and automatically zeroized on drop
    pub password: SecretString,

    /// Upper bound for a single request
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// TLS certificate verification enabled
    ///
    /// **SECURITY WARNING**: Disabling TLS verification exposes the application
    /// to man-in-the-middle attacks. It is rejected in production.
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl SunatConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        use secrecy::ExposeSecret;

        let endpoint = url::Url::parse(&self.endpoint)
            .map_err(|e| format!("sunat.endpoint '{}' is not a valid URL: {e}", self.endpoint))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err("sunat.endpoint must start with http:// or https://".to_string());
        }

        if self.username.trim().is_empty() {
            return Err("sunat.username cannot be empty".to_string());
        }
        if self.password.expose_secret().is_empty() {
            return Err("sunat.password cannot be empty".to_string());
        }
        if self.timeout_seconds == 0 {
            return Err("sunat.timeout_seconds must be > 0".to_string());
        }

        if *environment == Environment::Production {
            if !self.tls_verify {
                return Err(
                    "TLS certificate verification cannot be disabled in production environments. \
                    Set 'tls_verify = true', or use environment = \"development\" or \"staging\" for testing."
                        .to_string(),
                );
            }
            if endpoint.scheme() != "https" {
                return Err("sunat.endpoint must use https in production environments".to_string());
            }
        }

        self.retry.validate()
    }
}

impl Default for SunatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: String::new(),
            password: secret_string(String::new()),
            timeout_seconds: default_timeout_seconds(),
            tls_verify: true,
            retry: RetryConfig::default(),
        }
    }
}

/// Signing key material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// PEM private key (PKCS#8 or PKCS#1, RSA only)
    pub private_key_path: PathBuf,

    /// X.509 certificate, PEM or DER
    pub certificate_path: PathBuf,

    /// `Id` of the signature block, referenced from `cac:Signature`
    #[serde(default = "default_signature_id")]
    pub signature_id: String,
}

impl SigningConfig {
    fn validate(&self) -> Result<(), String> {
        if self.private_key_path.as_os_str().is_empty() {
            return Err("signing.private_key_path cannot be empty".to_string());
        }
        if self.certificate_path.as_os_str().is_empty() {
            return Err("signing.certificate_path cannot be empty".to_string());
        }
        if self.signature_id.is_empty() || self.signature_id.contains(char::is_whitespace) {
            return Err(format!(
                "signing.signature_id '{}' must be a non-empty token without whitespace",
                self.signature_id
            ));
        }
        Ok(())
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for signed XML and ZIP files
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Directory for receipt containers, one subdirectory per document
    #[serde(default = "default_receipts_directory")]
    pub receipts_directory: PathBuf,

    /// Write artifacts to disk
    #[serde(default = "default_true")]
    pub write_artifacts: bool,
}

impl OutputConfig {
    /// Submission ledger file, kept next to the artifacts
    pub fn ledger_path(&self) -> PathBuf {
        self.directory.join(LEDGER_FILE_NAME)
    }

    fn validate(&self) -> Result<(), String> {
        if self.write_artifacts {
            if self.directory.as_os_str().is_empty() {
                return Err("output.directory cannot be empty".to_string());
            }
            if self.receipts_directory.as_os_str().is_empty() {
                return Err("output.receipts_directory cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            receipts_directory: default_receipts_directory(),
            write_artifacts: true,
        }
    }
}

/// File name of the submission ledger inside `output.directory`
pub const LEDGER_FILE_NAME: &str = "ledger.json";

/// Receipt interpretation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptConfig {
    /// How response codes are compared against the observed band
    #[serde(default)]
    pub code_comparison: CodeComparison,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "https://e-beta.sunat.gob.pe/ol-ti-itcpfegem-beta/billService".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_signature_id() -> String {
    "SignatureSP".to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("out")
}

fn default_receipts_directory() -> PathBuf {
    PathBuf::from("out/cdr")
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
