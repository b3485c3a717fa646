//! Domain models and types for the e-invoice pipeline.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **The canonical input** ([`CanonicalDocument`], [`LineItem`], [`DeclaredTotals`])
//! - **Strongly-typed identifiers** ([`Ruc`], [`NaturalKey`])
//! - **Error types** ([`CpeError`] and one error enum per pipeline stage)
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible pipeline operations return [`Result<T, CpeError>`]:
//!
//! ```rust
//! use sunat_cpe::domain::{CanonicalDocument, Result};
//!
//! fn example(json: &str) -> Result<String> {
//!     let document = CanonicalDocument::from_json(json)?;
//!     Ok(document.document_id())
//! }
//! ```

pub mod document;
pub mod errors;
pub mod ids;
pub mod result;
pub mod status;

// Re-export commonly used types for convenience
pub use document::{
    Address, Buyer, CanonicalDocument, Currency, DeclaredTotals, DocumentType, Installment,
    Issuer, LegendNote, LineItem, PaymentMethod, PaymentTerms, FREE_TRANSFER_CODE,
};
pub use errors::{
    ClassificationError, CpeError, ReceiptError, SignatureError, Stage, SubmissionError,
    TransmissionError, ValidationError, ValidationIssue, XmlError,
};
pub use ids::{NaturalKey, Ruc};
pub use result::Result;
pub use status::ComplianceStatus;
