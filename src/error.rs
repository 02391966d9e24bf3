//! Error types for the postcraft drafting pipeline.

use serde_json::Value;
use thiserror::Error;

/// Crate-wide error type.
///
/// Provider variants carry enough detail for the orchestrator to classify a
/// failure as fatal-authorization or transient (see [`ApiError::describe`]).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed with status {status}: {message}")]
    ProviderRequestFailed {
        status: u16,
        message: String,
        payload: Option<Value>,
    },

    #[error("Provider connection failed: {0}")]
    ProviderNetwork(String),

    #[error("Provider returned an invalid response: {0}")]
    ProviderResponseInvalid(String),

    #[error("Provider returned no content")]
    ProviderEmptyResponse,

    #[error("Provider response contained no image payload")]
    NoImagePayload,

    #[error("Provider failed with an unstructured error")]
    ProviderOpaque(Value),

    #[error("Authorization required: {0}")]
    AuthorizationRequired(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Sharing is not supported by this target")]
    ShareUnsupported,

    #[error("Share cancelled")]
    ShareCancelled,

    #[error("Share failed: {0}")]
    ShareFailed(String),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const UNKNOWN_ERROR: &str = "Unknown error";

impl ApiError {
    /// Normalize the error into a single display string.
    ///
    /// Plain failures render as their message. Structured provider failures
    /// render as message, status, and a best-effort JSON dump of the response
    /// payload. Opaque values are serialized whole.
    pub fn describe(&self) -> String {
        match self {
            ApiError::ProviderRequestFailed {
                status,
                message,
                payload,
            } => {
                let mut out = format!("{} (status {})", message, status);
                if let Some(body) = payload.as_ref().and_then(|p| serde_json::to_string(p).ok()) {
                    out.push(' ');
                    out.push_str(&body);
                }
                out
            }
            ApiError::ProviderOpaque(value) => {
                serde_json::to_string(value).unwrap_or_else(|_| UNKNOWN_ERROR.to_string())
            }
            other => {
                let text = other.to_string();
                if text.trim().is_empty() {
                    UNKNOWN_ERROR.to_string()
                } else {
                    text
                }
            }
        }
    }

    /// True for failures raised by the generation provider.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            ApiError::ProviderError(_)
                | ApiError::ProviderRequestFailed { .. }
                | ApiError::ProviderNetwork(_)
                | ApiError::ProviderResponseInvalid(_)
                | ApiError::ProviderEmptyResponse
                | ApiError::NoImagePayload
                | ApiError::ProviderOpaque(_)
                | ApiError::AuthorizationRequired(_)
        )
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::ProviderResponseInvalid(err.to_string())
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
