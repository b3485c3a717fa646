//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for SUNAT CPE using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// SUNAT CPE - electronic invoice submission
#[derive(Parser, Debug)]
#[command(name = "sunat-cpe")]
#[command(version, about, long_about = None)]
#[command(author = "SUNAT CPE Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sunat-cpe.toml", env = "SUNAT_CPE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SUNAT_CPE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign and submit a document to the billing service
    Submit(commands::submit::SubmitArgs),

    /// Build the UBL document without sending it
    Build(commands::build::BuildArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_submit() {
        let cli = Cli::parse_from(["sunat-cpe", "submit", "invoice.json"]);
        assert_eq!(cli.config, "sunat-cpe.toml");
        match cli.command {
            Commands::Submit(args) => {
                assert_eq!(args.input.to_str(), Some("invoice.json"));
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["sunat-cpe", "--config", "custom.toml", "submit", "a.json"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["sunat-cpe", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_submit_dry_run() {
        let cli = Cli::parse_from(["sunat-cpe", "submit", "--dry-run", "invoice.json"]);
        assert!(matches!(cli.command, Commands::Submit(args) if args.dry_run));
    }

    #[test]
    fn test_cli_parse_build() {
        let cli = Cli::parse_from(["sunat-cpe", "build", "invoice.json", "--sign", "-o", "out.xml"]);
        match cli.command {
            Commands::Build(args) => {
                assert!(args.sign);
                assert_eq!(args.output.as_deref().and_then(|p| p.to_str()), Some("out.xml"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["sunat-cpe", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }
}
