//! Drafting orchestrator
//!
//! Owns the application state and sequences one generation cycle:
//! text generation, then a fan-out of one image request per platform, then
//! optional single-platform regeneration. Failures are classified here and
//! turned into state transitions or notices; no provider error escapes to the
//! presentation layer.
//!
//! State sits behind one mutex that is never held across an `.await`. Each
//! completion re-locks and applies its update to the latest state, and only if
//! the result set still carries the epoch the request was issued under.

use crate::auth::{AuthState, KeySelector};
use crate::draft::{
    GenerationRequest, HashtagError, Platform, PlatformResult, ResultSet, Tone,
};
use crate::error::ApiError;
use crate::image::ImageRequestConfig;
use crate::provider::{ImageGenerationService, TextGenerationService};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub mod classify;
pub mod notify;

pub use classify::{classify, classify_message, ErrorClass};
pub use notify::{Notice, Notifier, RecordingNotifier, TracingNotifier};

/// Collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Services {
    pub text: Arc<dyn TextGenerationService>,
    pub images: Arc<dyn ImageGenerationService>,
    pub keys: Arc<dyn KeySelector>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub image_config: ImageRequestConfig,
    /// Image requests in flight at once; the default starts all four together.
    pub max_parallel_images: usize,
    pub initial_auth: AuthState,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            image_config: ImageRequestConfig::default(),
            max_parallel_images: Platform::ALL.len(),
            initial_auth: AuthState::Unauthorized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyIdea,
    InProgress,
    NotAuthorized,
    NoDraft,
}

/// Result of [`Orchestrator::generate`].
#[derive(Debug)]
pub enum GenerateOutcome {
    /// Nothing happened.
    Skipped(SkipReason),
    /// Text phase failed with a transient error; a notice was raised.
    TextFailed { detail: String },
    /// Text phase failed with a fatal authorization error.
    Locked,
    /// Drafts are in place and the image batch is running.
    Drafted(ImageBatch),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    Stored,
    Failed { fatal: bool, detail: String },
    /// Not requested because a fatal failure was already observed.
    Skipped,
    /// Completed after its result set was replaced; discarded.
    Stale,
}

/// Result of [`Orchestrator::regenerate_image`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerateOutcome {
    Skipped(SkipReason),
    Finished(ImageOutcome),
}

/// Fan-in summary of one image batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub epoch: u64,
    pub outcomes: BTreeMap<Platform, ImageOutcome>,
}

impl BatchReport {
    pub fn stored_count(&self) -> usize {
        self.count(|o| matches!(o, ImageOutcome::Stored))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ImageOutcome::Failed { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ImageOutcome::Skipped))
    }

    pub fn outcome(&self, platform: Platform) -> Option<&ImageOutcome> {
        self.outcomes.get(&platform)
    }

    fn count(&self, pred: impl Fn(&ImageOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }
}

/// Handle to a running image batch.
#[derive(Debug)]
pub struct ImageBatch {
    epoch: u64,
    handle: JoinHandle<BatchReport>,
}

impl ImageBatch {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait until every platform's request has settled.
    pub async fn settled(self) -> BatchReport {
        let epoch = self.epoch;
        self.handle.await.unwrap_or_else(|e| {
            error!(epoch, error = %e, "Image batch task did not complete");
            BatchReport {
                epoch,
                outcomes: BTreeMap::new(),
            }
        })
    }
}

/// Read-only view for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct AppSnapshot {
    pub idea: String,
    pub tone: Tone,
    pub auth: AuthState,
    pub epoch: u64,
    pub text_in_progress: bool,
    pub fatal_auth: bool,
    pub image_config: ImageRequestConfig,
    /// Hidden unless authorized.
    pub results: Option<ResultSet>,
}

impl AppSnapshot {
    /// Whether the generate action is enabled.
    pub fn can_generate(&self) -> bool {
        !self.idea.trim().is_empty() && !self.text_in_progress && self.auth.allows_generation()
    }
}

struct OrchestratorState {
    idea: String,
    tone: Tone,
    results: Option<ResultSet>,
    text_in_progress: bool,
    fatal_auth: bool,
    auth: AuthState,
    epoch: u64,
    image_config: ImageRequestConfig,
}

pub struct Orchestrator {
    services: Services,
    max_parallel_images: usize,
    state: Mutex<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(services: Services, options: OrchestratorOptions) -> Arc<Self> {
        Arc::new(Self {
            services,
            max_parallel_images: options.max_parallel_images.max(1),
            state: Mutex::new(OrchestratorState {
                idea: String::new(),
                tone: Tone::Professional,
                results: None,
                text_in_progress: false,
                fatal_auth: false,
                auth: options.initial_auth,
                epoch: 0,
                image_config: options.image_config,
            }),
        })
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let state = self.state.lock();
        AppSnapshot {
            idea: state.idea.clone(),
            tone: state.tone,
            auth: state.auth,
            epoch: state.epoch,
            text_in_progress: state.text_in_progress,
            fatal_auth: state.fatal_auth,
            image_config: state.image_config,
            results: if state.auth.allows_generation() {
                state.results.clone()
            } else {
                None
            },
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.state.lock().auth
    }

    pub fn set_idea(&self, idea: impl Into<String>) {
        self.state.lock().idea = idea.into();
    }

    pub fn set_tone(&self, tone: Tone) {
        self.state.lock().tone = tone;
    }

    pub fn image_config(&self) -> ImageRequestConfig {
        self.state.lock().image_config
    }

    /// Applies to requests issued after this call.
    pub fn set_image_config(&self, config: ImageRequestConfig) {
        info!(
            aspect_ratio = %config.aspect_ratio,
            resolution = %config.resolution,
            "Image settings updated"
        );
        self.state.lock().image_config = config;
    }

    /// Run the key-selection flow. Unlocks generation on success.
    pub async fn authorize(&self) -> bool {
        match self.services.keys.select_key().await {
            Ok(true) => {
                {
                    let mut state = self.state.lock();
                    state.fatal_auth = false;
                    state.auth = AuthState::Authorized;
                }
                info!("Authorization succeeded");
                self.services.notifier.notify(Notice::Reauthorized);
                true
            }
            Ok(false) => {
                info!(auth = %self.auth_state(), "Key selection cancelled");
                false
            }
            Err(e) => {
                warn!(error = %e, auth = %self.auth_state(), "Key selection failed");
                false
            }
        }
    }

    /// Generate from the idea and tone currently held in state.
    pub async fn generate_current(self: &Arc<Self>) -> GenerateOutcome {
        let (idea, tone) = {
            let state = self.state.lock();
            (state.idea.clone(), state.tone)
        };
        self.generate(&idea, tone).await
    }

    /// Start a new cycle: draft text, then illustrate every platform.
    ///
    /// Returns once the text phase is over; the image batch keeps running in
    /// the background and can be awaited through the returned handle.
    pub async fn generate(self: &Arc<Self>, idea: &str, tone: Tone) -> GenerateOutcome {
        let Some(request) = GenerationRequest::new(idea, tone) else {
            debug!("Ignoring generate request with an empty idea");
            return GenerateOutcome::Skipped(SkipReason::EmptyIdea);
        };

        let epoch = {
            let mut state = self.state.lock();
            if state.text_in_progress {
                return GenerateOutcome::Skipped(SkipReason::InProgress);
            }
            if !state.auth.allows_generation() {
                debug!(auth = %state.auth, "Ignoring generate request while not authorized");
                return GenerateOutcome::Skipped(SkipReason::NotAuthorized);
            }
            state.epoch += 1;
            state.results = None;
            state.fatal_auth = false;
            state.text_in_progress = true;
            state.idea = request.idea().to_string();
            state.tone = request.tone();
            state.epoch
        };

        info!(epoch, tone = %tone, "Text generation started");
        let drafted = self
            .services
            .text
            .generate(request.idea(), request.tone())
            .await;

        match drafted {
            Ok(drafts) => {
                {
                    let mut state = self.state.lock();
                    state.text_in_progress = false;
                    state.results = Some(ResultSet::from_drafts(epoch, drafts));
                }
                info!(epoch, "Text generation completed");
                GenerateOutcome::Drafted(self.generate_all_images(epoch))
            }
            Err(err) => {
                self.state.lock().text_in_progress = false;
                let (class, detail) = self.handle_failure(&err, "text", None).await;
                match class {
                    ErrorClass::FatalAuthorization => GenerateOutcome::Locked,
                    ErrorClass::Other => {
                        self.services
                            .notifier
                            .notify(Notice::TextGenerationFailed {
                                detail: detail.clone(),
                            });
                        GenerateOutcome::TextFailed { detail }
                    }
                }
            }
        }
    }

    /// Mark every card loading, then request all images concurrently.
    ///
    /// The loading flags are set before this returns, so any snapshot taken
    /// afterwards shows the whole set as loading until completions arrive.
    pub fn generate_all_images(self: &Arc<Self>, epoch: u64) -> ImageBatch {
        let prompts: Vec<(Platform, String)> = {
            let mut state = self.state.lock();
            match state.results.as_mut() {
                Some(results) if results.epoch() == epoch => results
                    .iter_mut()
                    .map(|(platform, result)| {
                        result.image_loading = true;
                        (platform, result.image_prompt.clone())
                    })
                    .collect(),
                _ => Vec::new(),
            }
        };

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run_image_batch(epoch, prompts).await });
        ImageBatch { epoch, handle }
    }

    async fn run_image_batch(&self, epoch: u64, prompts: Vec<(Platform, String)>) -> BatchReport {
        info!(epoch, count = prompts.len(), "Image batch started");
        let outcomes: BTreeMap<Platform, ImageOutcome> = stream::iter(prompts)
            .map(|(platform, prompt)| async move {
                let outcome = self.run_image_task(epoch, platform, &prompt).await;
                (platform, outcome)
            })
            .buffer_unordered(self.max_parallel_images)
            .collect()
            .await;

        let report = BatchReport { epoch, outcomes };
        info!(
            epoch,
            stored = report.stored_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            "Image batch settled"
        );
        report
    }

    /// Request a fresh image for one platform. Other cards are untouched.
    pub async fn regenerate_image(&self, platform: Platform) -> RegenerateOutcome {
        let (epoch, prompt) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if !state.auth.allows_generation() {
                return RegenerateOutcome::Skipped(SkipReason::NotAuthorized);
            }
            let Some(results) = state.results.as_mut() else {
                return RegenerateOutcome::Skipped(SkipReason::NoDraft);
            };
            let epoch = results.epoch();
            let Some(result) = results.get_mut(platform) else {
                return RegenerateOutcome::Skipped(SkipReason::NoDraft);
            };
            if result.image_loading {
                return RegenerateOutcome::Skipped(SkipReason::InProgress);
            }
            state.fatal_auth = false;
            result.image_loading = true;
            (epoch, result.image_prompt.clone())
        };

        info!(epoch, platform = %platform.slug(), "Regenerating image");
        RegenerateOutcome::Finished(self.run_image_task(epoch, platform, &prompt).await)
    }

    async fn run_image_task(&self, epoch: u64, platform: Platform, prompt: &str) -> ImageOutcome {
        // Re-read the flag and settings right before the call, never earlier.
        let config = {
            let state = self.state.lock();
            if state.fatal_auth {
                None
            } else {
                Some(state.image_config)
            }
        };
        let Some(config) = config else {
            debug!(epoch, platform = %platform.slug(), "Skipping image request after fatal failure");
            self.update_card(epoch, platform, |card| card.image_loading = false);
            return ImageOutcome::Skipped;
        };

        match self.services.images.generate(prompt, platform, &config).await {
            Ok(image) => {
                let applied = self.update_card(epoch, platform, |card| {
                    card.image = Some(image);
                    card.image_loading = false;
                });
                if applied {
                    debug!(epoch, platform = %platform.slug(), "Image stored");
                    ImageOutcome::Stored
                } else {
                    ImageOutcome::Stale
                }
            }
            Err(err) => {
                // A superseded cycle's failure must not touch the live cycle's auth state.
                if !self.update_card(epoch, platform, |card| card.image_loading = false) {
                    debug!(epoch, platform = %platform.slug(), error = %err, "Discarding stale failure");
                    return ImageOutcome::Stale;
                }
                let already_fatal = self.state.lock().fatal_auth;
                if already_fatal {
                    let detail = err.describe();
                    debug!(epoch, platform = %platform.slug(), error = %detail, "Image failed after fatal failure");
                    return ImageOutcome::Failed {
                        fatal: classify_message(&detail) == ErrorClass::FatalAuthorization,
                        detail,
                    };
                }
                let (class, detail) = self.handle_failure(&err, "image", Some(platform)).await;
                if class == ErrorClass::Other {
                    self.services.notifier.notify(Notice::ImageGenerationFailed {
                        platform,
                        detail: detail.clone(),
                    });
                }
                ImageOutcome::Failed {
                    fatal: class == ErrorClass::FatalAuthorization,
                    detail,
                }
            }
        }
    }

    /// Classification path shared by text and image failures.
    ///
    /// The first fatal failure of a cycle locks the app, raises one alert and
    /// re-runs key selection; later ones in the same cycle are absorbed.
    async fn handle_failure(
        &self,
        err: &ApiError,
        phase: &'static str,
        platform: Option<Platform>,
    ) -> (ErrorClass, String) {
        let (class, detail) = classify(err);
        let platform = platform.map(Platform::slug).unwrap_or("-");

        if class == ErrorClass::Other {
            warn!(phase, platform, error = %detail, "Generation failed");
            return (class, detail);
        }

        let first = {
            let mut state = self.state.lock();
            if state.fatal_auth {
                false
            } else {
                state.fatal_auth = true;
                state.auth = AuthState::Locked;
                true
            }
        };
        if !first {
            debug!(phase, platform, "Fatal failure already handled this cycle");
            return (class, detail);
        }

        error!(phase, platform, error = %detail, "Fatal authorization failure; locking");
        self.services.notifier.notify(Notice::BillingRequired {
            detail: detail.clone(),
        });
        if !self.authorize().await {
            info!("Remaining locked until a new key is selected");
        }
        (class, detail)
    }

    /// Apply `update` to the card only if its result set is still current.
    fn update_card(
        &self,
        epoch: u64,
        platform: Platform,
        update: impl FnOnce(&mut PlatformResult),
    ) -> bool {
        let mut state = self.state.lock();
        match state.results.as_mut() {
            Some(results) if results.epoch() == epoch => match results.get_mut(platform) {
                Some(card) => {
                    update(card);
                    true
                }
                None => false,
            },
            _ => {
                debug!(epoch, platform = %platform.slug(), "Discarding stale completion");
                false
            }
        }
    }

    /// Add a tag to the Instagram card.
    pub fn add_hashtag(&self, raw: &str) -> Result<String, HashtagError> {
        let mut state = self.state.lock();
        let tags = state
            .results
            .as_mut()
            .and_then(|r| r.get_mut(Platform::Instagram))
            .and_then(|card| card.hashtags.as_mut())
            .ok_or(HashtagError::NoDraft)?;
        tags.add(raw).map(str::to_string)
    }

    /// Remove the tag at `index` from the Instagram card.
    pub fn remove_hashtag(&self, index: usize) -> Result<Option<String>, HashtagError> {
        let mut state = self.state.lock();
        let tags = state
            .results
            .as_mut()
            .and_then(|r| r.get_mut(Platform::Instagram))
            .and_then(|card| card.hashtags.as_mut())
            .ok_or(HashtagError::NoDraft)?;
        Ok(tags.remove(index))
    }
}
