//! Canonical invoice representation
//!
//! [`CanonicalDocument`] is the input of the pipeline. It is created once per
//! submission and never mutated; every later stage derives new values from it.

use super::errors::ValidationError;
use super::ids::{NaturalKey, Ruc};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document type (catalog 01)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Factura
    #[serde(rename = "01")]
    Invoice,
    /// Boleta de venta
    #[serde(rename = "03")]
    Receipt,
    /// Nota de credito
    #[serde(rename = "07")]
    CreditNote,
    /// Nota de debito
    #[serde(rename = "08")]
    DebitNote,
}

impl DocumentType {
    /// Catalog 01 code
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "01",
            DocumentType::Receipt => "03",
            DocumentType::CreditNote => "07",
            DocumentType::DebitNote => "08",
        }
    }

    /// Only invoices and receipts can be built
    pub fn is_supported(&self) -> bool {
        matches!(self, DocumentType::Invoice | DocumentType::Receipt)
    }

    /// Required first letter of the series
    pub fn series_prefix(&self) -> Option<char> {
        match self {
            DocumentType::Invoice => Some('F'),
            DocumentType::Receipt => Some('B'),
            DocumentType::CreditNote | DocumentType::DebitNote => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "01" => Ok(DocumentType::Invoice),
            "03" => Ok(DocumentType::Receipt),
            "07" => Ok(DocumentType::CreditNote),
            "08" => Ok(DocumentType::DebitNote),
            other => Err(format!("Unknown document type '{other}'")),
        }
    }
}

/// Document currency (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    PEN,
    USD,
    EUR,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::PEN => "PEN",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Registration address of a party
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// INEI ubigeo code
    #[serde(default)]
    pub ubigeo: String,
    #[serde(default)]
    pub line: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub district: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

/// Issuing taxpayer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    pub ruc: String,
    pub legal_name: String,
    #[serde(default)]
    pub trade_name: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub email: Option<String>,
}

/// Buyer identity (catalog 06 document type)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buyer {
    /// Identity document type: 1 DNI, 4 foreign card, 6 RUC, 7 passport
    pub document_type: String,
    pub document_number: String,
    pub legal_name: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub email: Option<String>,
}

/// A single invoice line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    /// UN/ECE rec 20 unit code, e.g. `NIU`
    pub unit_code: String,
    /// Tax-exclusive unit value
    pub unit_value: Decimal,
    /// Tax-inclusive unit sale price
    pub unit_price: Decimal,
    /// Tax-exclusive line total
    pub line_total: Decimal,
    pub tax_amount: Decimal,
    /// Catalog 07 affectation code
    pub affectation_code: String,
    #[serde(default)]
    pub product_code: String,
    /// UNSPSC classification
    #[serde(default)]
    pub classification: Option<String>,
    /// Catalog 16 price type; derived from the affectation code when absent
    #[serde(default)]
    pub price_type_code: Option<String>,
}

impl LineItem {
    /// Free transfers (code 21) carry no sale price
    pub fn is_free_transfer(&self) -> bool {
        self.affectation_code == FREE_TRANSFER_CODE
    }

    /// Catalog 16 price type
    ///
    /// Free transfers are always `02`, whatever the input says, since their
    /// price is forced to zero. Other lines default to `01`.
    pub fn price_type(&self) -> &str {
        if self.is_free_transfer() {
            return "02";
        }
        match &self.price_type_code {
            Some(code) if !code.is_empty() => code,
            _ => "01",
        }
    }
}

/// Affectation code of free transfers
pub const FREE_TRANSFER_CODE: &str = "21";

/// Legend note (catalog 52), e.g. the amount in words
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendNote {
    pub code: String,
    pub description: String,
}

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "Contado")]
    Cash,
    #[serde(rename = "Credito")]
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Contado",
            PaymentMethod::Credit => "Credito",
        }
    }
}

/// One credit installment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    /// Installment identifier, e.g. `Cuota001`
    pub number: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

/// Payment terms with an optional installment schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerms {
    pub method: PaymentMethod,
    #[serde(default)]
    pub installments: Vec<Installment>,
}

/// Totals declared by the caller
///
/// These are checked against the classified items before anything is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredTotals {
    /// Sum of taxable (codes 10-17) line totals
    pub taxed: Decimal,
    /// Total IGV
    pub tax: Decimal,
    /// Total sale price including taxes
    pub tax_inclusive: Decimal,
    /// Amount payable
    pub payable: Decimal,
}

/// Canonical invoice, the pipeline input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDocument {
    pub series: String,
    pub number: String,
    pub issue_date: NaiveDate,
    pub issue_time: NaiveTime,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub document_type: DocumentType,
    pub currency: Currency,
    /// Catalog 51 operation type
    #[serde(default = "default_operation_type")]
    pub operation_type: String,
    pub issuer: Issuer,
    pub buyer: Buyer,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub legends: Vec<LegendNote>,
    #[serde(default)]
    pub payment: Option<PaymentTerms>,
    pub totals: DeclaredTotals,
    /// Perception regime indicator (`01`, `02`, `03`)
    #[serde(default)]
    pub perception: Option<String>,
}

impl CanonicalDocument {
    /// Parse a document from its JSON representation
    pub fn from_json(json: &str) -> crate::domain::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Document identifier `SERIES-NUMBER`
    pub fn document_id(&self) -> String {
        format!("{}-{}", self.series, self.number)
    }

    /// Natural key identifying this submission
    pub fn natural_key(&self) -> Result<NaturalKey, ValidationError> {
        let ruc = Ruc::new(self.issuer.ruc.clone())
            .map_err(|e| ValidationError::single("issuer.ruc", e))?;
        NaturalKey::new(
            ruc,
            self.document_type,
            self.series.clone(),
            self.number.clone(),
        )
        .map_err(|e| ValidationError::single("series", e))
    }
}

fn default_operation_type() -> String {
    "0101".to_string()
}

fn default_country_code() -> String {
    "PE".to_string()
}
