use thiserror::Error;

/// Error types for the resolution pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network failure, timeout or server-side error from the translation service
    #[error("Translation service error: {0}")]
    TransientService(String),
    /// Service answered, but not with a flat word → translation object
    #[error("Malformed service response: {0}")]
    MalformedResponse(String),
    /// Token store or glossary snapshot could not be written
    #[error("Persistence write error: {0}")]
    PersistenceWrite(String),
    /// Invalid run input, e.g. an unknown book code
    #[error("Validation error: {0}")]
    Validation(String),
    /// Missing API key, bad rule table, unknown provider
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Whether the retry policy should attempt the call again
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::TransientService(_))
    }

    /// Errors that abort a run before any batch work is done
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Validation(_) | PipelineError::Config(_))
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PipelineError::MalformedResponse(err.to_string())
        } else {
            PipelineError::TransientService(err.to_string())
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_retryable() {
        assert!(PipelineError::TransientService("timeout".into()).is_retryable());
        assert!(!PipelineError::MalformedResponse("x".into()).is_retryable());
        assert!(!PipelineError::PersistenceWrite("x".into()).is_retryable());
        assert!(!PipelineError::Validation("x".into()).is_retryable());
    }

    #[test]
    fn test_only_validation_and_config_are_fatal() {
        assert!(PipelineError::Validation("unknown book".into()).is_fatal());
        assert!(PipelineError::Config("no key".into()).is_fatal());
        assert!(!PipelineError::TransientService("x".into()).is_fatal());
        assert!(!PipelineError::PersistenceWrite("x".into()).is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let err = PipelineError::Validation("unknown book code 'XYZ'".into());
        assert_eq!(err.to_string(), "Validation error: unknown book code 'XYZ'");
    }
}
