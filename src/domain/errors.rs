//! Domain error types
//!
//! This module defines the error hierarchy for the e-invoice pipeline.
//! Every variant of [`CpeError`] belongs to exactly one pipeline stage and
//! carries a stable error code so callers can report failures uniformly.
//! Third-party error types never leak out of this hierarchy.

use super::status::ComplianceStatus;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Main error type for the e-invoice pipeline
///
/// Errors abort the pipeline at the stage that raised them; there is no
/// partial-success state.
#[derive(Debug, Error)]
pub enum CpeError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed or inconsistent input document
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unrecognized tax affectation code
    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    /// UBL document could not be produced
    #[error("Document build error: {0}")]
    DocumentBuild(String),

    /// Signing failures (missing slot, unsupported key, crypto failure)
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    /// Transport failures and remote faults
    #[error("Transmission error: {0}")]
    Transmission(#[from] TransmissionError),

    /// Malformed or incomplete receipt
    #[error("Receipt error: {0}")]
    Receipt(#[from] ReceiptError),

    /// Submission ledger conflicts
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// XML parsing or tree manipulation errors
    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Setup,
    Validation,
    Classification,
    Build,
    Signing,
    Transmission,
    Receipt,
    Ledger,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::Validation => "validation",
            Stage::Classification => "classification",
            Stage::Build => "build",
            Stage::Signing => "signing",
            Stage::Transmission => "transmission",
            Stage::Receipt => "receipt",
            Stage::Ledger => "ledger",
        };
        f.write_str(name)
    }
}

impl CpeError {
    /// Stage that raised this error
    pub fn stage(&self) -> Stage {
        match self {
            CpeError::Configuration(_) | CpeError::Io(_) | CpeError::Serialization(_) => {
                Stage::Setup
            }
            CpeError::Validation(_) => Stage::Validation,
            CpeError::Classification(_) => Stage::Classification,
            CpeError::DocumentBuild(_) | CpeError::Xml(_) => Stage::Build,
            CpeError::Signature(_) => Stage::Signing,
            CpeError::Transmission(_) => Stage::Transmission,
            CpeError::Receipt(_) => Stage::Receipt,
            CpeError::Submission(_) => Stage::Ledger,
        }
    }

    /// Stable, stage-specific error code
    pub fn code(&self) -> &'static str {
        match self {
            CpeError::Configuration(_) => "CONFIGURATION",
            CpeError::Validation(_) => "VALIDATION",
            CpeError::Classification(_) => "CLASSIFICATION",
            CpeError::DocumentBuild(_) | CpeError::Xml(_) => "DOCUMENT_BUILD",
            CpeError::Signature(_) => "SIGNATURE",
            CpeError::Transmission(TransmissionError::Fault { .. }) => "PROTOCOL_FAULT",
            CpeError::Transmission(_) => "TRANSMISSION",
            CpeError::Receipt(_) => "RECEIPT_PARSE",
            CpeError::Submission(_) => "SUBMISSION_STATE",
            CpeError::Serialization(_) => "SERIALIZATION",
            CpeError::Io(_) => "IO",
        }
    }

    /// Status reported for a submission that stopped with this error
    pub fn status(&self) -> ComplianceStatus {
        ComplianceStatus::Error
    }

    /// Whether repeating the same submission may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CpeError::Transmission(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for CpeError {
    fn from(err: std::io::Error) -> Self {
        CpeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CpeError {
    fn from(err: serde_json::Error) -> Self {
        CpeError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CpeError {
    fn from(err: toml::de::Error) -> Self {
        CpeError::Configuration(err.to_string())
    }
}

/// A single rule violation found while validating an input document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field, e.g. `items[2].quantity`
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Input validation failure
///
/// Carries every issue found, not only the first, so the caller can report
/// them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Build an error from a single issue
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                field: field.into(),
                message: message.into(),
            }],
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tax classification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// Affectation code not present in the fixed catalog
    #[error("Unknown affectation code '{code}' on line {line}")]
    UnknownAffectationCode { line: usize, code: String },
}

/// Signature embedding errors
///
/// All of these are fatal and non-retryable.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The unsigned document has no `ext:ExtensionContent` slot
    #[error("Document has no extension slot for the signature")]
    MissingExtensionSlot,

    /// The unsigned document already carries a signature block
    #[error("Document already carries a signature")]
    AlreadySigned,

    /// Key is not an RSA key
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Key or certificate could not be read or decoded
    #[error("Invalid key material: {0}")]
    KeyMaterial(String),

    /// Canonicalization failure
    #[error("Canonicalization failed: {0}")]
    Canonicalization(String),

    /// RSA signing or verification failure
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// Signed document does not have the expected signature structure
    #[error("Malformed signature: {0}")]
    Malformed(String),

    /// Recomputed digest differs from the one recorded in the signature
    #[error("Digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch { expected: String, computed: String },
}

/// Transmission errors
#[derive(Debug, Error)]
pub enum TransmissionError {
    /// The signed document could not be zipped, or the receipt unzipped
    #[error("Archive error: {0}")]
    Archive(String),

    /// Connection could not be established
    #[error("Failed to connect to billing service: {0}")]
    ConnectionFailed(String),

    /// Request exceeded the configured timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The connection failed after the request may have been written
    #[error("Connection lost after sending, outcome unknown: {0}")]
    OutcomeUnknown(String),

    /// Non-SOAP HTTP error response
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Response was neither a success nor a fault envelope
    #[error("Invalid response from billing service: {0}")]
    InvalidResponse(String),

    /// Fault envelope returned by the remote service
    #[error("Remote fault {code}: {description}")]
    Fault { code: String, description: String },

    /// Receipt archive had no XML entry
    #[error("Receipt archive has no XML entry: {0}")]
    MissingReceiptEntry(String),
}

impl TransmissionError {
    /// Connection failures and server-side HTTP errors are retryable.
    ///
    /// A timeout is not: the request may already have been recorded remotely.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransmissionError::ConnectionFailed(_) => true,
            TransmissionError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the remote side certainly did not record the request
    pub fn never_reached_remote(&self) -> bool {
        matches!(
            self,
            TransmissionError::Archive(_) | TransmissionError::ConnectionFailed(_)
        )
    }
}

/// Receipt parsing errors
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Receipt XML could not be parsed
    #[error("Malformed receipt: {0}")]
    Malformed(String),

    /// A required receipt field is absent
    #[error("Receipt is missing {0}")]
    MissingField(&'static str),
}

/// Submission ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Another attempt holds the claim for this natural key
    #[error("Submission {0} is already in progress")]
    InProgress(String),

    /// The document was sent but no receipt was recorded; resending could duplicate it
    #[error("Submission {0} was already sent and has no recorded receipt")]
    AlreadySent(String),

    /// A ledger transition was attempted by an attempt that does not hold the claim
    #[error("Attempt {attempt_id} does not hold the claim on {natural_key}")]
    StaleAttempt {
        natural_key: String,
        attempt_id: String,
    },
}

/// XML parsing and tree errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    /// Input is not well-formed
    #[error("Failed to parse XML: {0}")]
    Parse(String),

    /// A prefix is used without a namespace declaration in scope
    #[error("Unbound namespace prefix: {0}")]
    UnboundPrefix(String),

    /// A node path does not address an element
    #[error("Invalid node path: {0:?}")]
    InvalidPath(Vec<usize>),
}
