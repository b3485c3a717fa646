//! Fixed catalog of tax categories keyed by affectation code (catalog 07)

use rust_decimal::Decimal;
use serde::Serialize;

/// Tax treatment resolved from an affectation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxCategory {
    /// UN/ECE 5305 category identifier
    pub category_id: &'static str,
    /// UN/ECE 5153 tax scheme identifier (catalog 05)
    pub scheme_id: &'static str,
    pub scheme_name: &'static str,
    pub type_code: &'static str,
    /// Rate in percent
    pub percent: u32,
}

impl TaxCategory {
    /// Rate as a percentage, e.g. `18`
    pub fn percent(&self) -> Decimal {
        Decimal::from(self.percent)
    }
}

pub const TAXED: TaxCategory = TaxCategory {
    category_id: "S",
    scheme_id: "1000",
    scheme_name: "IGV",
    type_code: "VAT",
    percent: 18,
};

pub const EXONERATED: TaxCategory = TaxCategory {
    category_id: "E",
    scheme_id: "9997",
    scheme_name: "EXO",
    type_code: "VAT",
    percent: 0,
};

pub const FREE: TaxCategory = TaxCategory {
    category_id: "Z",
    scheme_id: "9996",
    scheme_name: "GRA",
    type_code: "FRE",
    percent: 0,
};

pub const UNAFFECTED: TaxCategory = TaxCategory {
    category_id: "O",
    scheme_id: "9998",
    scheme_name: "INA",
    type_code: "INA",
    percent: 0,
};

pub const EXPORT: TaxCategory = TaxCategory {
    category_id: "G",
    scheme_id: "9995",
    scheme_name: "EXP",
    type_code: "FRE",
    percent: 0,
};

/// Result of looking up an affectation code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Classified(&'static TaxCategory),
    UnknownCode(String),
}

/// Look up the category of an affectation code
///
/// Unknown codes are reported as [`Classification::UnknownCode`], never
/// defaulted to a taxable category.
///
/// # Examples
///
/// ```
/// use sunat_cpe::core::tax::catalog::{classify_code, Classification, TAXED};
///
/// assert_eq!(classify_code("13"), Classification::Classified(&TAXED));
/// assert!(matches!(classify_code("99"), Classification::UnknownCode(_)));
/// ```
pub fn classify_code(code: &str) -> Classification {
    match code {
        "10" | "11" | "12" | "13" | "14" | "15" | "16" | "17" => Classification::Classified(&TAXED),
        "20" => Classification::Classified(&EXONERATED),
        "21" => Classification::Classified(&FREE),
        "30" | "31" | "32" | "33" | "34" | "35" | "36" | "37" => {
            Classification::Classified(&UNAFFECTED)
        }
        "40" => Classification::Classified(&EXPORT),
        other => Classification::UnknownCode(other.to_string()),
    }
}
