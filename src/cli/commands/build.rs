//! Build command implementation
//!
//! Writes the UBL document for a canonical JSON document, optionally signed.

use super::{exit_code_for, read_document};
use crate::config::load_config;
use crate::core::submission::Submitter;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Canonical document (JSON)
    pub input: PathBuf,

    /// Output file; defaults to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Embed the signature using the configured key
    #[arg(long)]
    pub sign: bool,
}

impl BuildArgs {
    /// Execute the build command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        let document = match read_document(&self.input).await {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Failed to read {}: {e}", self.input.display());
                return Ok(3);
            }
        };

        let submitter = Submitter::from_config(&config)?;
        let built = submitter.prepare(&document).and_then(|prepared| {
            if self.sign {
                submitter.sign(&prepared.unsigned).map(|signed| signed.xml)
            } else {
                Ok(prepared.unsigned.xml)
            }
        });

        let xml = match built {
            Ok(xml) => xml,
            Err(e) => {
                eprintln!("❌ {} failed [{}]: {e}", e.stage(), e.code());
                return Ok(exit_code_for(&e));
            }
        };

        match &self.output {
            Some(path) => {
                tokio::fs::write(path, &xml).await?;
                tracing::info!(path = %path.display(), bytes = xml.len(), "Wrote document");
                println!("✅ Wrote {}", path.display());
            }
            None => {
                use std::io::Write;
                std::io::stdout().write_all(&xml)?;
            }
        }

        Ok(0)
    }
}
