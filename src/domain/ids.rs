//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that key a submission.

use super::document::DocumentType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Taxpayer registry number (RUC) newtype wrapper
///
/// A RUC is exactly 11 ASCII digits.
///
/// # Examples
///
/// ```
/// use sunat_cpe::domain::ids::Ruc;
/// use std::str::FromStr;
///
/// let ruc = Ruc::from_str("20123456789").unwrap();
/// assert_eq!(ruc.as_str(), "20123456789");
/// assert!(Ruc::new("2012345678").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ruc(String);

impl Ruc {
    /// Creates a new Ruc, checking its format
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.len() != 11 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("RUC must be 11 digits, got '{value}'"));
        }
        Ok(Self(value))
    }

    /// Returns the RUC as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ruc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ruc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ruc {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ruc> for String {
    fn from(ruc: Ruc) -> Self {
        ruc.0
    }
}

impl AsRef<str> for Ruc {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Natural key of a submission: issuer RUC + document type + series + number
///
/// Its display form `RUC-TT-SERIES-NUMBER` is also the base name of every
/// artifact produced for the document (XML, ZIP, receipt).
///
/// # Examples
///
/// ```
/// use sunat_cpe::domain::ids::NaturalKey;
/// use std::str::FromStr;
///
/// let key = NaturalKey::from_str("20123456789-01-F001-123").unwrap();
/// assert_eq!(key.series(), "F001");
/// assert_eq!(key.base_name(), "20123456789-01-F001-123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    ruc: Ruc,
    document_type: DocumentType,
    series: String,
    number: String,
}

impl NaturalKey {
    /// Creates a natural key from its parts
    pub fn new(
        ruc: Ruc,
        document_type: DocumentType,
        series: impl Into<String>,
        number: impl Into<String>,
    ) -> Result<Self, String> {
        let series = series.into();
        let number = number.into();
        if series.trim().is_empty() || series.contains('-') {
            return Err(format!("Invalid series '{series}'"));
        }
        if number.trim().is_empty() || number.contains('-') {
            return Err(format!("Invalid number '{number}'"));
        }
        Ok(Self {
            ruc,
            document_type,
            series,
            number,
        })
    }

    pub fn ruc(&self) -> &Ruc {
        &self.ruc
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Base name shared by the XML, archive and receipt artifacts
    pub fn base_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.ruc,
            self.document_type.code(),
            self.series,
            self.number
        )
    }
}

impl FromStr for NaturalKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 4 {
            return Err(format!(
                "Natural key must have the form RUC-TT-SERIES-NUMBER, got '{s}'"
            ));
        }
        let ruc = Ruc::new(parts[0])?;
        let document_type = DocumentType::from_str(parts[1])?;
        Self::new(ruc, document_type, parts[2], parts[3])
    }
}
