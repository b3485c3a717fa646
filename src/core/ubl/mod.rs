//! UBL 2.1 document synthesis with SUNAT extensions
//!
//! [`DocumentBuilder`] turns a validated [`CanonicalDocument`](crate::domain::CanonicalDocument)
//! and its [`TaxSummary`](crate::core::tax::TaxSummary) into an
//! [`UnsignedArtifact`]: deterministic XML bytes whose first
//! `ext:ExtensionContent` is left empty for the signature.

pub mod builder;
pub mod normalize;

pub use builder::{DocumentBuilder, UnsignedArtifact};

/// Default namespace of invoice documents
pub const NS_INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
pub const NS_CAC: &str =
    "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
pub const NS_CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
pub const NS_CCTS: &str = "urn:un:unece:uncefact:documentation:2";
pub const NS_DS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const NS_EXT: &str =
    "urn:oasis:names:specification:ubl:schema:xsd:CommonExtensionComponents-2";
pub const NS_QDT: &str = "urn:oasis:names:specification:ubl:schema:xsd:QualifiedDatatypes-2";
pub const NS_SAC: &str =
    "urn:sunat:names:specification:ubl:peru:schema:xsd:SunatAggregateComponents-1";
pub const NS_UDT: &str = "urn:un:unece:uncefact:data:specification:UnqualifiedDataTypesSchemaModule:2";
pub const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const NS_XSD: &str = "http://www.w3.org/2001/XMLSchema";

/// Qualified name of the signature slot
pub const SIGNATURE_SLOT: &str = "ext:ExtensionContent";
