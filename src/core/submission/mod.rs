//! Submission orchestration
//!
//! [`Submitter`] runs the stages in order for one document:
//!
//! 1. **Validate** the canonical document
//! 2. **Classify** its items and check the declared totals
//! 3. **Build** the unsigned UBL document
//! 4. **Sign** it with the configured key
//! 5. **Send** it to the billing service
//! 6. **Interpret** the receipt
//!
//! Every step is awaited in sequence; an error aborts at its stage. The
//! [`SubmissionLedger`] keys attempts by natural key so the same document is
//! never transmitted twice.

pub mod ledger;
pub mod pipeline;

pub use ledger::{
    Claim, FileSubmissionStore, InMemorySubmissionStore, LedgerEntry, LedgerState,
    SubmissionLedger, SubmissionStore,
};
pub use pipeline::{PreparedDocument, Submitter};

use crate::domain::ComplianceStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Caller-facing outcome of a completed transmission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    /// `RUC-TT-SERIES-NUMBER`
    pub natural_key: String,
    pub status: ComplianceStatus,
    /// Authority response code
    pub code: String,
    pub description: String,
    pub digest_value: String,
    pub signature_value: String,
    #[serde(with = "base64_bytes")]
    pub signed_xml: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub receipt_container: Vec<u8>,
    pub receipt_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_path: Option<PathBuf>,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
