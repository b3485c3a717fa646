//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the SUNAT CPE configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates after applying overrides
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Endpoint: {}", config.sunat.endpoint);
        println!("  Username: {}", config.sunat.username);
        println!("  Timeout: {}s", config.sunat.timeout_seconds);
        println!("  Max Retries: {}", config.sunat.retry.max_retries);
        println!("  Private Key: {}", config.signing.private_key_path.display());
        println!("  Certificate: {}", config.signing.certificate_path.display());
        println!("  Signature Id: {}", config.signing.signature_id);
        if config.output.write_artifacts {
            println!("  Output: {}", config.output.directory.display());
            println!("  Receipts: {}", config.output.receipts_directory.display());
        } else {
            println!("  Output: disabled");
        }
        println!("  Code Comparison: {}", config.receipt.code_comparison);
        println!();

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_configuration_error() {
        let code = ValidateArgs {}
            .execute("/nonexistent/sunat-cpe.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
