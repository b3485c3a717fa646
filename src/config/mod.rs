//! Configuration management.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Configuration files support:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `SUNAT_CPE_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sunat_cpe::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sunat-cpe.toml")?;
//! println!("Endpoint: {}", config.sunat.endpoint);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry run
//! - [`SunatConfig`] - Billing service endpoint, credentials, timeout, retry
//! - [`SigningConfig`] - Private key and certificate
//! - [`OutputConfig`] - Where artifacts are written
//! - [`ReceiptConfig`] - Response code comparison mode
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "development"
//!
//! [application]
//! log_level = "info"
//!
//! [sunat]
//! endpoint = "https://e-beta.sunat.gob.pe/ol-ti-itcpfegem-beta/billService"
//! username = "MODDATOS"
//! password = "${SUNAT_CPE_PASSWORD}"
//! timeout_seconds = 60
//!
//! [signing]
//! private_key_path = "keys/private.pem"
//! certificate_path = "keys/certificate.pem"
//!
//! [output]
//! directory = "out"
//! receipts_directory = "out/cdr"
//!
//! [receipt]
//! code_comparison = "lexicographic"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, CpeConfig, Environment, LoggingConfig, OutputConfig, ReceiptConfig,
    RetryConfig, SigningConfig, SunatConfig, LEDGER_FILE_NAME,
};
pub use secret::{secret_string, SecretString, SecretValue};
