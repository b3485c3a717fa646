//! Groups line items into tax buckets and derives document totals

use super::catalog::{classify_code, Classification, TaxCategory};
use crate::domain::{ClassificationError, LineItem, FREE_TRANSFER_CODE};
use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregate of every line sharing one affectation code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxBucket {
    pub code: String,
    pub category: &'static TaxCategory,
    /// Sum of line totals
    pub base: Decimal,
    /// Sum of line tax amounts
    pub tax: Decimal,
    /// Rate in percent
    pub rate: Decimal,
}

/// Result of classifying a document's items
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxSummary {
    /// One bucket per distinct code, in order of first appearance
    pub buckets: Vec<TaxBucket>,
    pub total_tax: Decimal,
    /// Sum of bucket bases excluding free transfers
    pub line_extension_total: Decimal,
    pub tax_inclusive_total: Decimal,
}

impl TaxSummary {
    pub fn bucket(&self, code: &str) -> Option<&TaxBucket> {
        self.buckets.iter().find(|b| b.code == code)
    }

    /// Sum of bases for a category id (`S`, `E`, `Z`, `O`, `G`)
    pub fn base_for_category(&self, category_id: &str) -> Decimal {
        self.buckets
            .iter()
            .filter(|b| b.category.category_id == category_id)
            .map(|b| b.base)
            .sum()
    }

    /// Sum of bases of taxable (IGV) buckets
    pub fn taxed_total(&self) -> Decimal {
        self.base_for_category("S")
    }

    /// Whether the document contains free transfers
    pub fn has_free_transfers(&self) -> bool {
        self.bucket(FREE_TRANSFER_CODE).is_some()
    }
}

/// Classify line items into tax buckets
///
/// Fails on the first line whose affectation code is not in the catalog.
/// Classification is pure: the same items always give an equal summary.
///
/// # Examples
///
/// ```
/// use sunat_cpe::core::tax::classify;
/// use sunat_cpe::domain::LineItem;
/// use rust_decimal::Decimal;
///
/// let item = LineItem {
///     description: "Widget".to_string(),
///     quantity: Decimal::ONE,
///     unit_code: "NIU".to_string(),
///     unit_value: Decimal::from(100),
///     unit_price: Decimal::from(118),
///     line_total: Decimal::from(100),
///     tax_amount: Decimal::from(18),
///     affectation_code: "10".to_string(),
///     product_code: "W-1".to_string(),
///     classification: None,
///     price_type_code: None,
/// };
/// let summary = classify(&[item]).unwrap();
/// assert_eq!(summary.total_tax, Decimal::from(18));
/// assert_eq!(summary.line_extension_total, Decimal::from(100));
/// ```
pub fn classify(items: &[LineItem]) -> Result<TaxSummary, ClassificationError> {
    let mut buckets: Vec<TaxBucket> = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let category = match classify_code(&item.affectation_code) {
            Classification::Classified(category) => category,
            Classification::UnknownCode(code) => {
                return Err(ClassificationError::UnknownAffectationCode {
                    line: index + 1,
                    code,
                })
            }
        };

        match buckets
            .iter_mut()
            .find(|b| b.code == item.affectation_code)
        {
            Some(bucket) => {
                bucket.base += item.line_total;
                bucket.tax += item.tax_amount;
            }
            None => buckets.push(TaxBucket {
                code: item.affectation_code.clone(),
                category,
                base: item.line_total,
                tax: item.tax_amount,
                rate: category.percent(),
            }),
        }
    }

    let total_tax: Decimal = buckets.iter().map(|b| b.tax).sum();
    let line_extension_total: Decimal = buckets
        .iter()
        .filter(|b| b.code != FREE_TRANSFER_CODE)
        .map(|b| b.base)
        .sum();

    tracing::debug!(
        buckets = buckets.len(),
        total_tax = %total_tax,
        line_extension_total = %line_extension_total,
        "Classified line items"
    );

    Ok(TaxSummary {
        buckets,
        total_tax,
        line_extension_total,
        tax_inclusive_total: line_extension_total + total_tax,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(code: &str, total: Decimal, tax: Decimal) -> LineItem {
        LineItem {
            description: format!("item {code}"),
            quantity: dec!(1),
            unit_code: "NIU".to_string(),
            unit_value: total,
            unit_price: total + tax,
            line_total: total,
            tax_amount: tax,
            affectation_code: code.to_string(),
            product_code: "P1".to_string(),
            classification: None,
            price_type_code: None,
        }
    }

    #[test]
    fn test_single_taxed_item() {
        let summary = classify(&[item("10", dec!(100), dec!(18))]).unwrap();
        assert_eq!(summary.total_tax, dec!(18.00));
        assert_eq!(summary.line_extension_total, dec!(100.00));
        assert_eq!(summary.tax_inclusive_total, dec!(118));
        assert_eq!(summary.buckets.len(), 1);
        assert_eq!(summary.buckets[0].rate, dec!(18));
        assert_eq!(summary.buckets[0].category.category_id, "S");
    }

    #[test]
    fn test_free_transfer_excluded_from_line_extension() {
        let summary = classify(&[
            item("10", dec!(50), dec!(9)),
            item("21", dec!(30), dec!(0)),
        ])
        .unwrap();
        assert_eq!(summary.line_extension_total, dec!(50));
        assert_eq!(summary.bucket("21").unwrap().base, dec!(30));
        assert!(summary.has_free_transfers());
    }

    #[test]
    fn test_buckets_aggregate_in_first_appearance_order() {
        let summary = classify(&[
            item("20", dec!(10), dec!(0)),
            item("10", dec!(100), dec!(18)),
            item("20", dec!(5.50), dec!(0)),
            item("10", dec!(20), dec!(3.60)),
        ])
        .unwrap();
        let codes: Vec<&str> = summary.buckets.iter().map(|b| b.code.as_str()).collect();
        assert_eq!(codes, vec!["20", "10"]);
        assert_eq!(summary.bucket("20").unwrap().base, dec!(15.50));
        assert_eq!(summary.bucket("10").unwrap().tax, dec!(21.60));
        assert_eq!(summary.taxed_total(), dec!(120));
    }

    #[test]
    fn test_tax_inclusive_invariant() {
        let items = vec![
            item("10", dec!(84.75), dec!(15.26)),
            item("21", dec!(12), dec!(0)),
            item("30", dec!(7.10), dec!(0)),
            item("40", dec!(3.33), dec!(0)),
        ];
        let summary = classify(&items).unwrap();
        let bases: Decimal = summary
            .buckets
            .iter()
            .filter(|b| b.code != "21")
            .map(|b| b.base)
            .sum();
        let taxes: Decimal = summary.buckets.iter().map(|b| b.tax).sum();
        assert!((bases + taxes - summary.tax_inclusive_total).abs() <= dec!(0.01));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let items = vec![item("10", dec!(1), dec!(0.18)), item("31", dec!(2), dec!(0))];
        assert_eq!(classify(&items).unwrap(), classify(&items).unwrap());
    }

    #[test]
    fn test_unknown_code_fails_explicitly() {
        let err = classify(&[item("10", dec!(1), dec!(0.18)), item("99", dec!(1), dec!(0))])
            .unwrap_err();
        assert_eq!(
            err,
            ClassificationError::UnknownAffectationCode {
                line: 2,
                code: "99".to_string()
            }
        );
    }
}
