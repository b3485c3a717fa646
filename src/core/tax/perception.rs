//! Perception surcharge applied to certain invoices

use crate::domain::DocumentType;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Computed perception surcharge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Perception {
    /// Regime indicator (`01`, `02`, `03`)
    pub regime: String,
    /// Rate in percent
    pub percent: Decimal,
    /// Payable amount the rate applies to
    pub base: Decimal,
    pub amount: Decimal,
    /// Payable amount plus the surcharge
    pub net_total: Decimal,
}

/// Rate in percent for a regime indicator
pub fn perception_percent(regime: &str) -> Option<Decimal> {
    match regime {
        "01" => Some(Decimal::from(2)),
        "02" => Some(Decimal::ONE),
        "03" => Some(Decimal::new(5, 1)),
        _ => None,
    }
}

/// Compute the perception surcharge
///
/// Applies only to invoices with a supported regime indicator; anything
/// else yields `None` rather than an error.
///
/// # Examples
///
/// ```
/// use sunat_cpe::core::tax::compute_perception;
/// use sunat_cpe::domain::DocumentType;
/// use rust_decimal::Decimal;
///
/// let perception = compute_perception(DocumentType::Invoice, Some("01"), Decimal::from(100)).unwrap();
/// assert_eq!(perception.amount.to_string(), "2.00");
/// assert_eq!(perception.net_total.to_string(), "102.00");
/// ```
pub fn compute_perception(
    document_type: DocumentType,
    regime: Option<&str>,
    payable: Decimal,
) -> Option<Perception> {
    if document_type != DocumentType::Invoice {
        return None;
    }
    let regime = regime?;
    let percent = perception_percent(regime)?;

    let amount = round_money(payable * percent / Decimal::ONE_HUNDRED);
    let net_total = round_money(payable + amount);

    Some(Perception {
        regime: regime.to_string(),
        percent,
        base: payable,
        amount,
        net_total,
    })
}

/// Round half away from zero to two decimals, keeping a scale of exactly 2
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
