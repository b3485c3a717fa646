//! Tax classification
//!
//! Maps each line's affectation code to a fixed tax category, aggregates
//! lines into per-code buckets and derives the document totals. The
//! perception surcharge is computed separately from the payable amount.

pub mod catalog;
pub mod classifier;
pub mod perception;

pub use catalog::{classify_code, Classification, TaxCategory};
pub use classifier::{classify, TaxBucket, TaxSummary};
pub use perception::{compute_perception, round_money, Perception};
