//! Core business logic for SUNAT CPE.
//!
//! # Modules
//!
//! - [`validation`] - Input and totals validation
//! - [`tax`] - Tax classification and perception
//! - [`ubl`] - UBL 2.1 document building
//! - [`signature`] - Enveloped XMLDSig embedding and verification
//! - [`receipt`] - Receipt (CDR) interpretation
//! - [`submission`] - Pipeline orchestration and the idempotency ledger
//!
//! # Submission Workflow
//!
//! 1. **Claim**: Reserve the natural key in the ledger
//! 2. **Validate**: Check the canonical document
//! 3. **Classify**: Aggregate items into tax buckets, check declared totals
//! 4. **Build**: Produce the unsigned UBL document
//! 5. **Sign**: Embed the enveloped signature
//! 6. **Send**: Zip, wrap in `sendBill` and post
//! 7. **Interpret**: Read the receipt code and store the result
//!
//! # Example
//!
//! ```rust,no_run
//! use sunat_cpe::config::load_config;
//! use sunat_cpe::core::submission::Submitter;
//! use sunat_cpe::domain::CanonicalDocument;
//!
//! # async fn example(document: CanonicalDocument) -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sunat-cpe.toml")?;
//! let submitter = Submitter::from_config(&config)?;
//!
//! // Build and sign only
//! let signed = submitter.dry_run(&document)?;
//! println!("Digest: {}", signed.digest_value);
//!
//! // Full submission
//! let result = submitter.submit(&document).await?;
//! println!("Status: {}", result.status);
//! # Ok(())
//! # }
//! ```

pub mod receipt;
pub mod signature;
pub mod submission;
pub mod tax;
pub mod ubl;
pub mod validation;
