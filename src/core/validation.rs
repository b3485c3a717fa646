//! Input validation for canonical documents
//!
//! [`validate_document`] checks the structure of a document before anything
//! is derived from it. [`validate_totals`] runs after classification and
//! compares the caller's declared totals with the classified items. Both
//! collect every issue instead of stopping at the first.

use crate::core::tax::TaxSummary;
use crate::domain::{
    CanonicalDocument, DocumentType, PaymentMethod, Ruc, ValidationError, ValidationIssue,
};
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;

/// Absolute tolerance for monetary comparisons
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Buyer identity types accepted on invoices and receipts
const BUYER_DOCUMENT_TYPES: [&str; 4] = ["1", "4", "6", "7"];

fn series_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9]{3}$").expect("series pattern is valid"))
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.push(field, message);
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues: self.0 })
        }
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= TOLERANCE
}

/// Validate the structure of a document
pub fn validate_document(doc: &CanonicalDocument) -> Result<(), ValidationError> {
    let mut issues = Issues::default();

    check_header(doc, &mut issues);
    check_issuer(doc, &mut issues);
    check_buyer(doc, &mut issues);
    check_items(doc, &mut issues);
    check_payment(doc, &mut issues);

    for (index, legend) in doc.legends.iter().enumerate() {
        issues.check(
            !legend.code.trim().is_empty(),
            &format!("legends[{index}].code"),
            "is required",
        );
    }

    issues.finish()
}

fn check_header(doc: &CanonicalDocument, issues: &mut Issues) {
    issues.check(
        doc.document_type.is_supported(),
        "documentType",
        format!("document type {} is not supported", doc.document_type),
    );

    if !series_pattern().is_match(&doc.series) {
        issues.push(
            "series",
            format!("'{}' must be one letter followed by three alphanumerics", doc.series),
        );
    } else if let Some(prefix) = doc.document_type.series_prefix() {
        issues.check(
            doc.series.starts_with(prefix),
            "series",
            format!("series for document type {} must start with '{prefix}'", doc.document_type),
        );
    }

    issues.check(
        is_digits(&doc.number) && doc.number.len() <= 8,
        "number",
        "must be 1 to 8 digits",
    );

    if let Some(due_date) = doc.due_date {
        issues.check(
            due_date >= doc.issue_date,
            "dueDate",
            "cannot be before the issue date",
        );
    }

    issues.check(
        !doc.operation_type.trim().is_empty(),
        "operationType",
        "is required",
    );
}

fn check_issuer(doc: &CanonicalDocument, issues: &mut Issues) {
    if let Err(e) = Ruc::new(doc.issuer.ruc.clone()) {
        issues.push("issuer.ruc", e);
    }
    issues.check(
        !doc.issuer.legal_name.trim().is_empty(),
        "issuer.legalName",
        "is required",
    );
    issues.check(
        !doc.issuer.address.line.trim().is_empty(),
        "issuer.address.line",
        "is required",
    );
}

fn check_buyer(doc: &CanonicalDocument, issues: &mut Issues) {
    let buyer = &doc.buyer;

    if !BUYER_DOCUMENT_TYPES.contains(&buyer.document_type.as_str()) {
        issues.push(
            "buyer.documentType",
            format!("'{}' is not a valid identity document type", buyer.document_type),
        );
    }
    issues.check(
        !buyer.legal_name.trim().is_empty(),
        "buyer.legalName",
        "is required",
    );

    match buyer.document_type.as_str() {
        "1" => issues.check(
            is_digits(&buyer.document_number) && buyer.document_number.len() == 8,
            "buyer.documentNumber",
            "DNI must be 8 digits",
        ),
        "6" => issues.check(
            is_digits(&buyer.document_number) && buyer.document_number.len() == 11,
            "buyer.documentNumber",
            "RUC must be 11 digits",
        ),
        _ => issues.check(
            !buyer.document_number.trim().is_empty(),
            "buyer.documentNumber",
            "is required",
        ),
    }

    match doc.document_type {
        DocumentType::Invoice => issues.check(
            buyer.document_type == "6",
            "buyer.documentType",
            "invoices can only be issued to buyers identified by RUC (type 6)",
        ),
        DocumentType::Receipt => issues.check(
            buyer.document_type != "6",
            "buyer.documentType",
            "receipts cannot be issued to buyers identified by RUC (type 6)",
        ),
        DocumentType::CreditNote | DocumentType::DebitNote => {}
    }
}

fn check_items(doc: &CanonicalDocument, issues: &mut Issues) {
    if doc.items.is_empty() {
        issues.push("items", "must contain at least one item");
        return;
    }

    for (index, item) in doc.items.iter().enumerate() {
        let field = |name: &str| format!("items[{index}].{name}");

        issues.check(
            !item.description.trim().is_empty(),
            &field("description"),
            "is required",
        );
        issues.check(
            !item.unit_code.trim().is_empty(),
            &field("unitCode"),
            "is required",
        );
        issues.check(
            item.quantity > Decimal::ZERO,
            &field("quantity"),
            "must be greater than 0",
        );
        issues.check(
            item.unit_value >= Decimal::ZERO,
            &field("unitValue"),
            "cannot be negative",
        );
        issues.check(
            item.tax_amount >= Decimal::ZERO,
            &field("taxAmount"),
            "cannot be negative",
        );

        if !item.is_free_transfer() {
            let expected = item.unit_value * item.quantity;
            issues.check(
                within_tolerance(expected, item.line_total),
                &field("lineTotal"),
                format!(
                    "inconsistent with unit value x quantity (expected {}, got {})",
                    expected.round_dp(2),
                    item.line_total
                ),
            );
        }
    }
}

fn check_payment(doc: &CanonicalDocument, issues: &mut Issues) {
    let Some(payment) = &doc.payment else {
        return;
    };

    match payment.method {
        PaymentMethod::Cash => issues.check(
            payment.installments.is_empty(),
            "payment.installments",
            "cash payments cannot have installments",
        ),
        PaymentMethod::Credit => {
            if payment.installments.is_empty() {
                issues.push(
                    "payment.installments",
                    "credit payments need at least one installment",
                );
            }
            for (index, installment) in payment.installments.iter().enumerate() {
                issues.check(
                    !installment.number.trim().is_empty(),
                    &format!("payment.installments[{index}].number"),
                    "is required",
                );
                issues.check(
                    installment.amount > Decimal::ZERO,
                    &format!("payment.installments[{index}].amount"),
                    "must be greater than 0",
                );
                issues.check(
                    installment.due_date >= doc.issue_date,
                    &format!("payment.installments[{index}].dueDate"),
                    "cannot be before the issue date",
                );
            }
            let scheduled: Decimal = payment.installments.iter().map(|i| i.amount).sum();
            issues.check(
                scheduled <= doc.totals.payable + TOLERANCE,
                "payment.installments",
                format!(
                    "installments add up to {scheduled}, more than the payable amount {}",
                    doc.totals.payable
                ),
            );
        }
    }
}

/// Compare declared totals with the classified items
pub fn validate_totals(doc: &CanonicalDocument, summary: &TaxSummary) -> Result<(), ValidationError> {
    let mut issues = Issues::default();
    let totals = &doc.totals;

    if !summary.has_free_transfers()
        && totals.taxed.is_zero()
        && totals.tax.is_zero()
        && totals.tax_inclusive.is_zero()
    {
        issues.push("totals", "cannot all be zero");
    }

    issues.check(
        within_tolerance(totals.taxed, summary.taxed_total()),
        "totals.taxed",
        format!(
            "inconsistent with items (expected {}, got {})",
            summary.taxed_total(),
            totals.taxed
        ),
    );
    issues.check(
        within_tolerance(totals.tax, summary.total_tax),
        "totals.tax",
        format!(
            "inconsistent with items (expected {}, got {})",
            summary.total_tax, totals.tax
        ),
    );
    issues.check(
        within_tolerance(totals.tax_inclusive, summary.tax_inclusive_total),
        "totals.taxInclusive",
        format!(
            "inconsistent with items (expected {}, got {})",
            summary.tax_inclusive_total, totals.tax_inclusive
        ),
    );
    issues.check(
        within_tolerance(totals.payable, totals.tax_inclusive),
        "totals.payable",
        "must equal the tax-inclusive total",
    );

    issues.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tax::classify;
    use crate::domain::{
        Address, Buyer, Currency, DeclaredTotals, Installment, Issuer, LineItem, PaymentTerms,
    };
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal_macros::dec;

    fn invoice() -> CanonicalDocument {
        CanonicalDocument {
            series: "F001".to_string(),
            number: "1".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            issue_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            due_date: None,
            document_type: DocumentType::Invoice,
            currency: Currency::PEN,
            operation_type: "0101".to_string(),
            issuer: Issuer {
                ruc: "20123456789".to_string(),
                legal_name: "ACME SAC".to_string(),
                trade_name: String::new(),
                address: Address {
                    line: "Av. Siempre Viva 123".to_string(),
                    ..Address::default()
                },
                email: None,
            },
            buyer: Buyer {
                document_type: "6".to_string(),
                document_number: "20987654321".to_string(),
                legal_name: "Cliente SAC".to_string(),
                address: Address::default(),
                email: None,
            },
            items: vec![LineItem {
                description: "Widget".to_string(),
                quantity: dec!(2),
                unit_code: "NIU".to_string(),
                unit_value: dec!(50),
                unit_price: dec!(59),
                line_total: dec!(100),
                tax_amount: dec!(18),
                affectation_code: "10".to_string(),
                product_code: "W-1".to_string(),
                classification: None,
                price_type_code: None,
            }],
            legends: vec![],
            payment: None,
            totals: DeclaredTotals {
                taxed: dec!(100),
                tax: dec!(18),
                tax_inclusive: dec!(118),
                payable: dec!(118),
            },
            perception: None,
        }
    }

    fn fields(err: ValidationError) -> Vec<String> {
        err.issues.into_iter().map(|i| i.field).collect()
    }

    #[test]
    fn test_valid_invoice() {
        let doc = invoice();
        assert!(validate_document(&doc).is_ok());
        let summary = classify(&doc.items).unwrap();
        assert!(validate_totals(&doc, &summary).is_ok());
    }

    #[test]
    fn test_series_rules() {
        let mut doc = invoice();
        doc.series = "B001".to_string();
        assert_eq!(fields(validate_document(&doc).unwrap_err()), vec!["series"]);

        doc.series = "f01".to_string();
        assert_eq!(fields(validate_document(&doc).unwrap_err()), vec!["series"]);
    }

    #[test]
    fn test_invoice_requires_ruc_buyer() {
        let mut doc = invoice();
        doc.buyer.document_type = "1".to_string();
        doc.buyer.document_number = "12345678".to_string();
        assert_eq!(
            fields(validate_document(&doc).unwrap_err()),
            vec!["buyer.documentType"]
        );
    }

    #[test]
    fn test_receipt_rejects_ruc_buyer() {
        let mut doc = invoice();
        doc.document_type = DocumentType::Receipt;
        doc.series = "B001".to_string();
        assert_eq!(
            fields(validate_document(&doc).unwrap_err()),
            vec!["buyer.documentType"]
        );
    }

    #[test]
    fn test_unsupported_document_type() {
        let mut doc = invoice();
        doc.document_type = DocumentType::CreditNote;
        assert!(fields(validate_document(&doc).unwrap_err()).contains(&"documentType".to_string()));
    }

    #[test]
    fn test_collects_every_issue() {
        let mut doc = invoice();
        doc.number = "123456789".to_string();
        doc.issuer.ruc = "123".to_string();
        doc.items[0].quantity = dec!(0);
        let found = fields(validate_document(&doc).unwrap_err());
        assert!(found.contains(&"number".to_string()));
        assert!(found.contains(&"issuer.ruc".to_string()));
        assert!(found.contains(&"items[0].quantity".to_string()));
    }

    #[test]
    fn test_line_total_consistency_skips_free_transfers() {
        let mut doc = invoice();
        doc.items[0].line_total = dec!(90);
        assert_eq!(
            fields(validate_document(&doc).unwrap_err()),
            vec!["items[0].lineTotal"]
        );

        doc.items[0].affectation_code = "21".to_string();
        assert!(validate_document(&doc).is_ok());
    }

    #[test]
    fn test_credit_terms_need_installments() {
        let mut doc = invoice();
        doc.payment = Some(PaymentTerms {
            method: PaymentMethod::Credit,
            installments: vec![],
        });
        assert_eq!(
            fields(validate_document(&doc).unwrap_err()),
            vec!["payment.installments"]
        );

        doc.payment = Some(PaymentTerms {
            method: PaymentMethod::Credit,
            installments: vec![Installment {
                number: "Cuota001".to_string(),
                amount: dec!(118),
                due_date: NaiveDate::from_ymd_opt(2025, 4, 14).unwrap(),
            }],
        });
        assert!(validate_document(&doc).is_ok());
    }

    #[test]
    fn test_totals_mismatch() {
        let mut doc = invoice();
        doc.totals.tax = dec!(17.98);
        let summary = classify(&doc.items).unwrap();
        assert_eq!(
            fields(validate_totals(&doc, &summary).unwrap_err()),
            vec!["totals.tax"]
        );

        doc.totals.tax = dec!(17.995);
        assert!(validate_totals(&doc, &summary).is_ok());
    }

    #[test]
    fn test_zero_totals_allowed_only_with_free_transfers() {
        let mut doc = invoice();
        doc.items[0].affectation_code = "21".to_string();
        doc.items[0].tax_amount = dec!(0);
        doc.totals = DeclaredTotals {
            taxed: dec!(0),
            tax: dec!(0),
            tax_inclusive: dec!(0),
            payable: dec!(0),
        };
        let summary = classify(&doc.items).unwrap();
        assert!(validate_totals(&doc, &summary).is_ok());
    }
}
