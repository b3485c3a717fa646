//! CLI command implementations
//!
//! Exit codes shared by every command:
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | success (approved or observed) |
//! | 1 | rejected by the authority |
//! | 2 | configuration error |
//! | 3 | invalid input document |
//! | 4 | transmission failure or remote fault |
//! | 5 | any other error |

pub mod build;
pub mod submit;
pub mod validate;

use crate::domain::{CanonicalDocument, CpeError, Stage};
use std::path::Path;

/// Exit code for a pipeline error
pub fn exit_code_for(error: &CpeError) -> i32 {
    match error.stage() {
        Stage::Setup if matches!(error, CpeError::Configuration(_)) => 2,
        Stage::Validation | Stage::Classification => 3,
        Stage::Transmission => 4,
        _ => 5,
    }
}

/// Read a canonical document from a JSON file
pub async fn read_document(path: &Path) -> crate::domain::Result<CanonicalDocument> {
    let json = tokio::fs::read_to_string(path).await?;
    CanonicalDocument::from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TransmissionError, ValidationError};

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&CpeError::Configuration("x".to_string())), 2);
        assert_eq!(
            exit_code_for(&ValidationError::single("series", "is required").into()),
            3
        );
        assert_eq!(
            exit_code_for(&TransmissionError::Timeout("60s".to_string()).into()),
            4
        );
        assert_eq!(exit_code_for(&CpeError::Io("disk full".to_string())), 5);
    }
}
