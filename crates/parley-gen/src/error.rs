//! Error types for the generation boundary.

use parley_core::error::ParleyError;
use thiserror::Error;

/// Errors from the generation service.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("SSE error: {0}")]
    Sse(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("API key not set (expected in {0})")]
    MissingKey(String),
}

impl From<reqwest::Error> for GenError {
    fn from(err: reqwest::Error) -> Self {
        GenError::Http(err.to_string())
    }
}

impl From<GenError> for ParleyError {
    fn from(err: GenError) -> Self {
        ParleyError::Generation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_error_display() {
        assert_eq!(
            GenError::Http("timeout".to_string()).to_string(),
            "HTTP error: timeout"
        );
        assert_eq!(
            GenError::Sse("bad frame".to_string()).to_string(),
            "SSE error: bad frame"
        );
        assert_eq!(
            GenError::Service("overloaded".to_string()).to_string(),
            "service error: overloaded"
        );
        assert_eq!(
            GenError::MissingKey("GEMINI_API_KEY".to_string()).to_string(),
            "API key not set (expected in GEMINI_API_KEY)"
        );
    }

    #[test]
    fn test_gen_error_into_parley_error() {
        let err: ParleyError = GenError::Service("overloaded".to_string()).into();
        assert!(matches!(err, ParleyError::Generation(_)));
        assert!(err.to_string().contains("overloaded"));
    }
}
