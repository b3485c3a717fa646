//! Receipt (CDR) interpretation
//!
//! The receipt entry is an `ApplicationResponse` whose
//! `DocumentResponse/Response` carries the authority's code and description.
//! Status derivation:
//!
//! | Code | Status |
//! |---|---|
//! | `"0"` | approved |
//! | in `[4000, 5000)` | observed |
//! | anything else | rejected |
//!
//! How a code is compared against the observed band is selected with
//! [`CodeComparison`].

use crate::adapters::sunat::ReceiptContainer;
use crate::domain::{ComplianceStatus, ReceiptError};
use crate::xml::parse;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const OBSERVED_LOW: u32 = 4000;
const OBSERVED_HIGH: u32 = 5000;

/// Comparison used for the observed band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeComparison {
    /// Raw string comparison against `"4000"` and `"5000"`; `"45"` is observed
    #[default]
    Lexicographic,
    /// Integer comparison; non-numeric codes are rejected
    Numeric,
}

impl fmt::Display for CodeComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeComparison::Lexicographic => write!(f, "lexicographic"),
            CodeComparison::Numeric => write!(f, "numeric"),
        }
    }
}

impl FromStr for CodeComparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexicographic" => Ok(CodeComparison::Lexicographic),
            "numeric" => Ok(CodeComparison::Numeric),
            other => Err(format!(
                "Invalid code comparison '{other}'. Must be 'lexicographic' or 'numeric'"
            )),
        }
    }
}

impl CodeComparison {
    /// Status for a response code
    pub fn status_for(&self, code: &str) -> ComplianceStatus {
        if code == "0" {
            return ComplianceStatus::Approved;
        }
        let observed = match self {
            CodeComparison::Lexicographic => {
                code >= OBSERVED_LOW.to_string().as_str()
                    && code < OBSERVED_HIGH.to_string().as_str()
            }
            CodeComparison::Numeric => code
                .parse::<u32>()
                .map(|n| (OBSERVED_LOW..OBSERVED_HIGH).contains(&n))
                .unwrap_or(false),
        };
        if observed {
            ComplianceStatus::Observed
        } else {
            ComplianceStatus::Rejected
        }
    }
}

/// Interpreted receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptRecord {
    pub code: String,
    pub description: String,
    pub status: ComplianceStatus,
    pub container_bytes: Vec<u8>,
    pub container_name: String,
    /// Where the container was written, when artifacts are kept on disk
    pub container_path: Option<PathBuf>,
    pub entry_name: String,
}

/// Reads response code and description out of a receipt container
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptInterpreter {
    comparison: CodeComparison,
}

impl ReceiptInterpreter {
    pub fn new(comparison: CodeComparison) -> Self {
        Self { comparison }
    }

    /// Interpret a receipt container
    ///
    /// # Errors
    ///
    /// [`ReceiptError::Malformed`] when the entry is not XML and
    /// [`ReceiptError::MissingField`] when the response code or description
    /// is absent.
    pub fn interpret(&self, container: &ReceiptContainer) -> Result<ReceiptRecord, ReceiptError> {
        let root = parse(&container.entry).map_err(|e| ReceiptError::Malformed(e.to_string()))?;

        let response = root
            .find_descendant("DocumentResponse")
            .and_then(|document_response| document_response.find_child("Response"))
            .ok_or(ReceiptError::MissingField("DocumentResponse/Response"))?;

        let code = response
            .find_child("ResponseCode")
            .map(|e| e.text_content().trim().to_string())
            .filter(|code| !code.is_empty())
            .ok_or(ReceiptError::MissingField("ResponseCode"))?;
        let description = response
            .find_child("Description")
            .map(|e| e.text_content().trim().to_string())
            .ok_or(ReceiptError::MissingField("Description"))?;

        let status = self.comparison.status_for(&code);
        tracing::debug!(code = %code, status = %status, "Interpreted receipt");

        Ok(ReceiptRecord {
            code,
            description,
            status,
            container_bytes: container.bytes.clone(),
            container_name: container.file_name.clone(),
            container_path: None,
            entry_name: container.entry_name.clone(),
        })
    }
}
