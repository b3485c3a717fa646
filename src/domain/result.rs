//! Result type alias for the pipeline
//!
//! Every fallible pipeline operation returns this alias so `?` converts
//! stage errors into [`CpeError`] automatically.

use super::errors::CpeError;

/// Result type alias using `CpeError` as the error type
///
/// # Examples
///
/// ```
/// use sunat_cpe::domain::result::Result;
/// use sunat_cpe::domain::errors::CpeError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(CpeError::DocumentBuild("unsupported document type".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CpeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{CpeError, SubmissionError};

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(CpeError::DocumentBuild("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> std::result::Result<i32, SubmissionError> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
