//! Generation Service Abstraction
//!
//! The orchestrator talks to two collaborators: a text service that drafts one
//! post per platform, and an image service that illustrates a single post.
//! Both are traits so the orchestration core can be driven by any provider;
//! [`gemini::GeminiClient`] implements both over the Gemini REST API.

use crate::draft::{PerPlatformDraft, Platform, Tone};
use crate::error::ApiError;
use crate::image::{ImageReference, ImageRequestConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;

/// Drafts copy for every platform from one idea.
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate(&self, idea: &str, tone: Tone) -> Result<PerPlatformDraft, ApiError>;
}

/// Produces one illustration for one platform.
#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        platform: Platform,
        config: &ImageRequestConfig,
    ) -> Result<ImageReference, ApiError>;
}

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_text_model")]
    pub text_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Inline key; prefer `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable the key is read from when `api_key` is unset.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.text_model.trim().is_empty() {
            return Err("Text model cannot be empty".to_string());
        }
        if self.image_model.trim().is_empty() {
            return Err("Image model cannot be empty".to_string());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("Request timeout must be greater than zero".to_string());
        }
        Ok(())
    }

    /// Inline key first, then the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
            })
    }
}

// Map transport-level failures onto ApiError
pub(crate) fn map_http_error(error: reqwest::Error) -> ApiError {
    if let Some(status) = error.status() {
        ApiError::ProviderRequestFailed {
            status: status.as_u16(),
            message: error.to_string(),
            payload: None,
        }
    } else if error.is_timeout() {
        ApiError::ProviderNetwork(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::ProviderNetwork(format!("Connection error: {}", error))
    } else {
        ApiError::ProviderError(format!("HTTP error: {}", error))
    }
}

/// Turn a non-success response into a structured failure.
///
/// Google-style bodies (`{"error": {"code", "message", "status"}}`) keep their
/// message and status string; anything else keeps the raw text.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error_from_body(status, &body)
}

pub(crate) fn error_from_body(status: u16, body: &str) -> ApiError {
    let payload: Option<Value> = serde_json::from_str(body).ok();
    let message = payload
        .as_ref()
        .and_then(|p| p.get("error"))
        .map(|e| {
            let status_name = e.get("status").and_then(Value::as_str).unwrap_or_default();
            let text = e.get("message").and_then(Value::as_str).unwrap_or_default();
            match (status_name.is_empty(), text.is_empty()) {
                (false, false) => format!("{}: {}", status_name, text),
                (false, true) => status_name.to_string(),
                _ => text.to_string(),
            }
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    ApiError::ProviderRequestFailed {
        status,
        message,
        payload,
    }
}

pub(crate) fn build_provider_http_client(config: &ProviderConfig) -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| ApiError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}
