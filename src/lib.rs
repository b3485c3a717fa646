// SUNAT CPE - Electronic invoice submission for SUNAT Peru
// Copyright (c) 2025 SUNAT CPE Contributors
// Licensed under the MIT License

//! # SUNAT CPE - Electronic invoice submission
//!
//! SUNAT CPE turns a canonical invoice into a signed UBL 2.1 document, sends
//! it to the SUNAT `billService` and interprets the authority's receipt (CDR).
//!
//! ## Overview
//!
//! - **Classifying** line items into tax buckets and document totals
//! - **Building** the UBL 2.1 invoice or receipt
//! - **Signing** it with an enveloped XMLDSig (exclusive C14N, RSA-SHA256)
//! - **Transmitting** it zipped inside a SOAP `sendBill` request
//! - **Interpreting** the receipt into approved, observed or rejected
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Pipeline stages and the submission orchestrator
//! - [`adapters`] - The SUNAT transport
//! - [`domain`] - Canonical document, identifiers and errors
//! - [`xml`] - Element tree, parsing, serialization and canonicalization
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sunat_cpe::config::load_config;
//! use sunat_cpe::core::submission::Submitter;
//! use sunat_cpe::domain::CanonicalDocument;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("sunat-cpe.toml")?;
//!     let document = CanonicalDocument::from_json(&std::fs::read_to_string("invoice.json")?)?;
//!
//!     let submitter = Submitter::from_config(&config)?;
//!     let result = submitter.submit(&document).await?;
//!
//!     println!("{}: {} {}", result.natural_key, result.status, result.code);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every stage reports through [`domain::CpeError`], which knows the stage
//! that raised it and a stable error code:
//!
//! ```rust,no_run
//! # async fn example(
//! #     submitter: &sunat_cpe::core::submission::Submitter,
//! #     document: &sunat_cpe::domain::CanonicalDocument,
//! # ) {
//! if let Err(e) = submitter.submit(document).await {
//!     eprintln!("{} failed [{}]: {e}", e.stage(), e.code());
//! }
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod xml;
