//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::AuthorizationRequired(msg) => format!(
            "{}\nSet the key in the environment variable named by provider.api_key_env \
             (GEMINI_API_KEY by default) or in provider.api_key.",
            msg
        ),
        ApiError::ConfigError(msg) => format!("Configuration error: {}", msg),
        other => other.describe(),
    }
}
