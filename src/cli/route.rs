//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::auth::{ApiKeyStore, AuthState, EnvKeySelector, KeySelector};
use crate::cli::help::{command_name, needs_provider};
use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_batch_report, format_downloads, format_draft_json, format_notices, format_ratio_table,
    format_settings, format_snapshot_text,
};
use crate::cli::session;
use crate::config::{ConfigLoader, PostcraftConfig};
use crate::draft::Tone;
use crate::error::ApiError;
use crate::image::{AspectRatioChoice, ImageRequestConfig, ResolutionTier};
use crate::orchestrator::{
    AppSnapshot, GenerateOutcome, Notice, Notifier, Orchestrator, OrchestratorOptions,
    RecordingNotifier, Services, SkipReason,
};
use crate::provider::GeminiClient;
use crate::share::download_image;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Runtime context for CLI execution: config, shared API key and the async runtime.
/// Built from the project path and optional config path using ConfigLoader only.
pub struct RunContext {
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    config: PostcraftConfig,
    keys: ApiKeyStore,
    runtime: tokio::runtime::Runtime,
}

impl RunContext {
    /// Create run context from project root and optional config path.
    pub fn new(project_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&project_root)?
        };

        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        let keys = ApiKeyStore::new(config.provider.resolve_api_key());
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create runtime: {}", e)))?;

        Ok(Self {
            project_root,
            config_path,
            config,
            keys,
            runtime,
        })
    }

    pub fn config(&self) -> &PostcraftConfig {
        &self.config
    }

    pub fn keys(&self) -> &ApiKeyStore {
        &self.keys
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub(crate) fn runtime(&self) -> &tokio::runtime::Runtime {
        &self.runtime
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        info!(
            command = name,
            config = ?self.config_path,
            provider = needs_provider(command),
            "Command started"
        );

        let result = match command {
            Commands::Draft {
                idea,
                tone,
                aspect_ratio,
                resolution,
                out,
                format,
            } => self.handle_draft(
                idea,
                *tone,
                *aspect_ratio,
                *resolution,
                out.as_deref(),
                *format,
            ),
            Commands::Session => session::run(self),
            Commands::Settings => format_settings(&self.config, self.keys.masked().as_deref()),
            Commands::Ratios { platform } => Ok(format_ratio_table(*platform)),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(command = name, duration_ms, "Command completed"),
            Err(e) => warn!(command = name, duration_ms, error = %e, "Command failed"),
        }
        result
    }

    /// Wire the Gemini client, key selection and notifier into an orchestrator.
    pub(crate) fn build_orchestrator(
        &self,
        keys: Arc<dyn KeySelector>,
        notifier: Arc<dyn Notifier>,
        image_config: ImageRequestConfig,
    ) -> Result<Arc<Orchestrator>, ApiError> {
        let client = Arc::new(GeminiClient::new(&self.config.provider, self.keys.clone())?);
        info!(
            text_model = client.text_model(),
            image_model = client.image_model(),
            "Provider client ready"
        );
        let initial_auth = if self.keys.is_set() {
            AuthState::Authorized
        } else {
            AuthState::Unauthorized
        };
        Ok(Orchestrator::new(
            Services {
                text: client.clone(),
                images: client,
                keys,
                notifier,
            },
            OrchestratorOptions {
                image_config,
                initial_auth,
                ..OrchestratorOptions::default()
            },
        ))
    }

    fn handle_draft(
        &self,
        idea: &str,
        tone: Tone,
        aspect_ratio: Option<AspectRatioChoice>,
        resolution: Option<ResolutionTier>,
        out: Option<&Path>,
        format: OutputFormat,
    ) -> Result<String, ApiError> {
        let mut image_config = self.config.image;
        if let Some(ratio) = aspect_ratio {
            image_config.aspect_ratio = ratio;
        }
        if let Some(tier) = resolution {
            image_config.resolution = tier;
        }

        let notifier = Arc::new(RecordingNotifier::new());
        let selector = Arc::new(EnvKeySelector::new(
            self.keys.clone(),
            self.config.provider.api_key_env.clone(),
        ));
        let orchestrator = self.build_orchestrator(selector, notifier.clone(), image_config)?;

        let report = match self.runtime.block_on(orchestrator.generate(idea, tone)) {
            GenerateOutcome::Skipped(SkipReason::EmptyIdea) => {
                return Err(ApiError::InvalidInput("Idea cannot be empty".to_string()))
            }
            GenerateOutcome::Skipped(SkipReason::NotAuthorized) => {
                return Err(ApiError::AuthorizationRequired(
                    "No API key has been selected".to_string(),
                ))
            }
            GenerateOutcome::Skipped(reason) => {
                return Err(ApiError::InvalidInput(format!(
                    "Generation skipped: {:?}",
                    reason
                )))
            }
            GenerateOutcome::TextFailed { detail } => {
                let message = Notice::TextGenerationFailed { detail: detail.clone() }.message();
                return Err(ApiError::ProviderError(format!("{} ({})", message, detail)));
            }
            GenerateOutcome::Locked => None,
            GenerateOutcome::Drafted(batch) => Some(self.runtime.block_on(batch.settled())),
        };

        let snapshot = orchestrator.snapshot();
        let notices = notifier.drain();
        if snapshot.auth == AuthState::Locked {
            let message = notices
                .iter()
                .find(|n| n.is_alert())
                .map(Notice::message)
                .unwrap_or_else(|| "Generation is locked".to_string());
            return Err(ApiError::AuthorizationRequired(message));
        }

        let downloads = match out {
            Some(dir) => download_all(dir, &snapshot)?,
            None => Vec::new(),
        };

        match format {
            OutputFormat::Json => format_draft_json(&snapshot, report.as_ref(), &notices, &downloads),
            OutputFormat::Text => {
                let mut output = format_snapshot_text(&snapshot);
                if let Some(report) = &report {
                    output.push_str("\nImages:\n");
                    output.push_str(&format_batch_report(report));
                }
                if !notices.is_empty() {
                    output.push_str("\n\n");
                    output.push_str(&format_notices(&notices));
                }
                if !downloads.is_empty() {
                    output.push_str("\n\n");
                    output.push_str(&format_downloads(&downloads));
                }
                Ok(output)
            }
        }
    }
}

/// Save every available image under `dir`.
pub(crate) fn download_all(dir: &Path, snapshot: &AppSnapshot) -> Result<Vec<PathBuf>, ApiError> {
    let Some(results) = &snapshot.results else {
        return Ok(Vec::new());
    };
    let now = Utc::now();
    results
        .iter()
        .filter_map(|(platform, card)| card.image.as_ref().map(|image| (platform, image)))
        .map(|(platform, image)| download_image(dir, platform, image, now))
        .collect()
}
