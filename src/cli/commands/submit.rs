//! Submit command implementation
//!
//! This module implements the `submit` command: one document from a JSON
//! file through validation, signing, transmission and receipt
//! interpretation.

use super::{exit_code_for, read_document};
use crate::config::load_config;
use crate::core::submission::Submitter;
use crate::domain::ComplianceStatus;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the submit command
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Canonical document (JSON)
    pub input: PathBuf,

    /// Validate, build and sign without sending
    #[arg(long)]
    pub dry_run: bool,

    /// Print the submission result as JSON
    #[arg(long)]
    pub json: bool,
}

impl SubmitArgs {
    /// Execute the submit command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), "Starting submit command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        let document = match read_document(&self.input).await {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read document");
                eprintln!("Failed to read {}: {e}", self.input.display());
                return Ok(3);
            }
        };

        let submitter = match Submitter::from_config(&config) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to initialize submitter: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        if config.application.dry_run {
            println!("🔍 DRY RUN MODE - the document will not be sent");
            println!();
            return match submitter.dry_run(&document) {
                Ok(signed) => {
                    println!("✅ Document built and signed");
                    println!("  Natural key: {}", signed.key);
                    println!("  Digest: {}", signed.digest_value);
                    println!("  Size: {} bytes", signed.xml.len());
                    Ok(0)
                }
                Err(e) => {
                    eprintln!("❌ {} failed [{}]: {e}", e.stage(), e.code());
                    Ok(exit_code_for(&e))
                }
            };
        }

        println!("🚀 Submitting {} to {}", document.document_id(), config.sunat.endpoint);

        let result = match submitter.submit(&document).await {
            Ok(r) => r,
            Err(e) => {
                eprintln!("❌ {} failed [{}]: {e}", e.stage(), e.code());
                return Ok(exit_code_for(&e));
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!();
            println!("📊 Submission Result:");
            println!("  Natural key: {}", result.natural_key);
            println!("  Status: {}", result.status);
            println!("  Code: {}", result.code);
            println!("  Description: {}", result.description);
            println!("  Digest: {}", result.digest_value);
            if let Some(path) = &result.xml_path {
                println!("  Signed XML: {}", path.display());
            }
            if let Some(path) = &result.receipt_path {
                println!("  Receipt: {}", path.display());
            }
            println!();
        }

        Ok(match result.status {
            ComplianceStatus::Approved | ComplianceStatus::Observed => 0,
            ComplianceStatus::Rejected => 1,
            ComplianceStatus::Error => 5,
        })
    }
}
