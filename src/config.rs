//! Configuration System
//!
//! Layered configuration for the provider connection, default image settings,
//! output directories and logging. See [`ConfigLoader`] for the layer order.

use crate::image::ImageRequestConfig;
use crate::logging::LoggingConfig;
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub use crate::provider::ProviderConfig;

mod facade;
mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostcraftConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Image settings a session starts with
    #[serde(default)]
    pub image: ImageRequestConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where downloads and shared cards land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Outbox for shared cards. Unset means sharing falls back to the clipboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_dir: Option<PathBuf>,
}

fn default_download_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(|d| d.join("postcraft")))
        .or_else(|| ProjectDirs::from("", "", "postcraft").map(|d| d.data_dir().join("downloads")))
        .unwrap_or_else(|| PathBuf::from("postcraft-downloads"))
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            share_dir: None,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Provider: {0}")]
    Provider(String),
    #[error("Output: {0}")]
    Output(String),
    #[error("Logging: {0}")]
    Logging(String),
}

impl PostcraftConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if self.output.download_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Output(
                "Download directory cannot be empty".to_string(),
            ));
        }
        if matches!(&self.output.share_dir, Some(dir) if dir.as_os_str().is_empty()) {
            errors.push(ValidationError::Output(
                "Share directory cannot be empty".to_string(),
            ));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Effective configuration as TOML, with any inline API key masked.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let mut shown = self.clone();
        if shown.provider.api_key.is_some() {
            shown.provider.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&shown)
    }
}
