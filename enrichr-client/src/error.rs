//! Error types for enrichr-client
//!
//! Validation errors are field-scoped and raised before any network activity.
//! Everything network-facing surfaces to the caller unchanged; nothing here is
//! retried automatically.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A validation failure attached to one input field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name as the caller knows it (e.g. `companyName`, `companies[3].name`)
    pub field: String,
    /// Human-readable message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Non-empty collection of field errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// First message recorded for `field`
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error
    pub fn into_result(self) -> Result<(), EnrichError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(EnrichError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        f.write_str(&joined.join("; "))
    }
}

/// Error discriminant for callers that branch on the failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Transport,
    UnexpectedClose,
    UpstreamHttp,
    Parse,
    Cancelled,
    Timeout,
    Conflict,
    Internal,
}

/// Orchestration engine error
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Field-scoped input validation failure (pre-network, non-fatal)
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Channel open failure, channel error event, or one-shot request failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Channel closed before the terminal message without the coordinator closing it
    #[error("Channel closed unexpectedly before completion (code {code:?}): {reason}")]
    UnexpectedClose { code: Option<u16>, reason: String },

    /// Non-2xx response from a one-shot endpoint
    #[error("Upstream HTTP error {status}: {context}")]
    UpstreamHttp { status: u16, context: String },

    /// Malformed upload or undecodable response body
    #[error("Parse error: {0}")]
    Parse(String),

    /// Job aborted by an external cancellation signal
    #[error("Enrichment job cancelled")]
    Cancelled,

    /// No message from the service within the idle timeout
    #[error("No message received from enrichment service within {0:?}")]
    Timeout(Duration),

    /// Request conflicts with current state (job already active, wrong mode)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// enrichr-common error
    #[error("Common error: {0}")]
    Common(#[from] enrichr_common::Error),
}

impl EnrichError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnrichError::Validation(_) => ErrorKind::Validation,
            EnrichError::Transport(_) => ErrorKind::Transport,
            EnrichError::UnexpectedClose { .. } => ErrorKind::UnexpectedClose,
            EnrichError::UpstreamHttp { .. } => ErrorKind::UpstreamHttp,
            EnrichError::Parse(_) => ErrorKind::Parse,
            EnrichError::Cancelled => ErrorKind::Cancelled,
            EnrichError::Timeout(_) => ErrorKind::Timeout,
            EnrichError::Conflict(_) => ErrorKind::Conflict,
            EnrichError::Common(_) => ErrorKind::Internal,
        }
    }

    /// Field errors, if this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            EnrichError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type for enrichr-client operations
pub type EnrichResult<T> = Result<T, EnrichError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_errors_into_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_field_errors_are_addressable() {
        let mut errors = ValidationErrors::new();
        errors.push("website", "Website is required");
        errors.push("product", "Product is required");

        let err = errors.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.message_for("website"), Some("Website is required"));
        assert_eq!(errors.message_for("territory"), None);
        assert_eq!(
            err.to_string(),
            "Validation failed: website: Website is required; product: Product is required"
        );
    }

    #[test]
    fn test_common_error_maps_to_internal() {
        let err: EnrichError = enrichr_common::Error::Config("bad".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
