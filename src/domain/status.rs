//! Compliance status reported to callers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a submission as seen by the caller
///
/// `Approved`, `Observed` and `Rejected` come from a receipt; `Error` is used
/// when the pipeline stopped before a receipt was interpreted, including
/// remote faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Approved,
    Observed,
    Rejected,
    Error,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Approved => "approved",
            ComplianceStatus::Observed => "observed",
            ComplianceStatus::Rejected => "rejected",
            ComplianceStatus::Error => "error",
        }
    }

    /// Whether the authority accepted the document (with or without observations)
    pub fn is_accepted(&self) -> bool {
        matches!(self, ComplianceStatus::Approved | ComplianceStatus::Observed)
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ComplianceStatus::Observed).unwrap();
        assert_eq!(json, "\"observed\"");
        assert!(ComplianceStatus::Observed.is_accepted());
        assert!(!ComplianceStatus::Rejected.is_accepted());
    }
}
