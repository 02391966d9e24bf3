//! Interactive drafting session.
//!
//! A menu loop over one orchestrator. Image batches run on the runtime's
//! worker threads while the menu waits for input, so cards fill in between
//! prompts; "Show cards" renders whatever has arrived.

use crate::auth::{ApiKeyStore, AuthState, KeySelector};
use crate::cli::presentation::{
    format_batch_report, format_card_text, format_downloads, format_image_config, format_notices,
    format_snapshot_text,
};
use crate::cli::route::RunContext;
use crate::draft::{Platform, Tone};
use crate::error::ApiError;
use crate::image::{AspectRatioChoice, ImageRequestConfig, ResolutionTier};
use crate::orchestrator::{
    GenerateOutcome, ImageBatch, ImageOutcome, Orchestrator, RecordingNotifier,
    RegenerateOutcome, SkipReason,
};
use crate::share::{
    copy_card, download_image, share_card, share_link, Clipboard, DirectoryShare, NoShareTarget,
    ShareOutcome, SharePayload, ShareTarget, TerminalClipboard,
};
use async_trait::async_trait;
use chrono::Utc;
use dialoguer::{Confirm, Input, Password, Select};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

fn input_error(e: dialoguer::Error) -> ApiError {
    ApiError::ConfigError(format!("Failed to get user input: {}", e))
}

/// Hands the orchestrator a key the menu loop has already collected.
///
/// Never touches the terminal: the orchestrator may ask for a key from a
/// worker thread while the menu owns stdin, so prompting stays on the menu
/// thread and this only reports what was entered there.
struct SessionKeySelector {
    store: ApiKeyStore,
    entered: Mutex<Option<String>>,
}

impl SessionKeySelector {
    fn new(store: ApiKeyStore) -> Self {
        Self {
            store,
            entered: Mutex::new(None),
        }
    }

    /// Queue a key for the next `select_key`. Blank input is ignored.
    fn offer(&self, key: String) -> bool {
        if key.trim().is_empty() {
            return false;
        }
        *self.entered.lock() = Some(key);
        true
    }
}

#[async_trait]
impl KeySelector for SessionKeySelector {
    async fn select_key(&self) -> Result<bool, ApiError> {
        let Some(key) = self.entered.lock().take() else {
            debug!("No key entered yet; deferring to the menu");
            return Ok(false);
        };
        self.store.set(key);
        info!("API key entered interactively");
        Ok(true)
    }
}

/// Outbox share that asks before writing.
struct ConfirmingShare {
    inner: DirectoryShare,
}

impl ShareTarget for ConfirmingShare {
    fn share(&self, payload: &SharePayload<'_>) -> Result<Vec<PathBuf>, ApiError> {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Share the {} post to {}?",
                payload.platform,
                self.inner.dir().display()
            ))
            .default(true)
            .interact()
            .map_err(input_error)?;
        if !confirmed {
            return Err(ApiError::ShareCancelled);
        }
        self.inner.share(payload)
    }
}

#[derive(Clone, Copy)]
enum Action {
    EnterIdea,
    ChooseTone,
    Generate,
    ShowCards,
    Regenerate,
    EditHashtags,
    Copy,
    Share,
    Download,
    Settings,
    SelectKey,
    Quit,
}

const ACTIONS: [(Action, &str); 12] = [
    (Action::EnterIdea, "Enter idea"),
    (Action::ChooseTone, "Choose tone"),
    (Action::Generate, "Generate"),
    (Action::ShowCards, "Show cards"),
    (Action::Regenerate, "Regenerate one image"),
    (Action::EditHashtags, "Edit Instagram hashtags"),
    (Action::Copy, "Copy a post"),
    (Action::Share, "Share a post"),
    (Action::Download, "Download an image"),
    (Action::Settings, "Image settings"),
    (Action::SelectKey, "Select API key"),
    (Action::Quit, "Quit"),
];

struct Session<'a> {
    ctx: &'a RunContext,
    orchestrator: Arc<Orchestrator>,
    notifier: Arc<RecordingNotifier>,
    keys: Arc<SessionKeySelector>,
    last_auth: AuthState,
    clipboard: TerminalClipboard<std::io::Stdout>,
    share_target: Box<dyn ShareTarget>,
    pending: Option<ImageBatch>,
}

pub(crate) fn run(ctx: &RunContext) -> Result<String, ApiError> {
    let notifier = Arc::new(RecordingNotifier::new());
    let keys = Arc::new(SessionKeySelector::new(ctx.keys().clone()));
    let orchestrator = ctx.build_orchestrator(keys.clone(), notifier.clone(), ctx.config().image)?;
    let share_target: Box<dyn ShareTarget> = match &ctx.config().output.share_dir {
        Some(dir) => Box::new(ConfirmingShare {
            inner: DirectoryShare::new(dir.clone()),
        }),
        None => Box::new(NoShareTarget),
    };

    let last_auth = orchestrator.auth_state();
    let mut session = Session {
        ctx,
        orchestrator,
        notifier,
        keys,
        last_auth,
        clipboard: TerminalClipboard::stdout(),
        share_target,
        pending: None,
    };
    session.run()
}

impl Session<'_> {
    fn run(&mut self) -> Result<String, ApiError> {
        if !self.ctx.keys().is_set() {
            println!("{}", "An API key is needed before generating.".yellow());
            self.select_key()?;
        }

        let labels: Vec<&str> = ACTIONS.iter().map(|(_, label)| *label).collect();
        loop {
            self.flush_notices();
            self.report_settled_batch();
            self.prompt_if_newly_locked()?;

            let choice = Select::new()
                .with_prompt(self.status_line())
                .items(&labels)
                .default(0)
                .interact_opt()
                .map_err(input_error)?;
            let Some(index) = choice else { break };
            let action = ACTIONS[index].0;
            debug!(action = ACTIONS[index].1, "Session action");

            let result = match action {
                Action::EnterIdea => self.enter_idea(),
                Action::ChooseTone => self.choose_tone(),
                Action::Generate => self.generate(),
                Action::ShowCards => {
                    println!("{}", format_snapshot_text(&self.orchestrator.snapshot()));
                    Ok(())
                }
                Action::Regenerate => self.regenerate(),
                Action::EditHashtags => self.edit_hashtags(),
                Action::Copy => self.copy(),
                Action::Share => self.share(),
                Action::Download => self.download(),
                Action::Settings => self.settings(),
                Action::SelectKey => self.select_key(),
                Action::Quit => break,
            };
            if let Err(e) = result {
                eprintln!("{}", crate::cli::map_error(&e).red());
            }
        }

        if let Some(batch) = self.pending.take() {
            self.ctx.runtime().block_on(batch.settled());
        }
        Ok("Session ended".to_string())
    }

    fn status_line(&self) -> String {
        let snapshot = self.orchestrator.snapshot();
        let loading = snapshot
            .results
            .as_ref()
            .map(|r| r.iter().filter(|(_, c)| c.image_loading).count())
            .unwrap_or(0);
        let mut line = format!("[{} | {}]", snapshot.auth, snapshot.tone);
        if !snapshot.idea.is_empty() {
            line.push_str(&format!(" {}", snapshot.idea));
        }
        if loading > 0 {
            line.push_str(&format!(" ({} images generating)", loading));
        }
        line
    }

    fn flush_notices(&self) {
        let notices = self.notifier.drain();
        if !notices.is_empty() {
            println!("{}", format_notices(&notices));
        }
    }

    /// Ask for a key once per lock, on the menu thread.
    fn prompt_if_newly_locked(&mut self) -> Result<(), ApiError> {
        let auth = self.orchestrator.auth_state();
        let newly_locked = auth == AuthState::Locked && self.last_auth != AuthState::Locked;
        self.last_auth = auth;
        if newly_locked {
            self.select_key()?;
        }
        Ok(())
    }

    fn select_key(&mut self) -> Result<(), ApiError> {
        let entered = Password::new()
            .with_prompt("Gemini API key from a billing-enabled project (empty to cancel)")
            .allow_empty_password(true)
            .interact()
            .map_err(input_error)?;
        if self.keys.offer(entered) {
            self.ctx.runtime().block_on(self.orchestrator.authorize());
        }
        self.last_auth = self.orchestrator.auth_state();
        self.flush_notices();
        Ok(())
    }

    fn report_settled_batch(&mut self) {
        if !self.pending.as_ref().is_some_and(ImageBatch::is_finished) {
            return;
        }
        if let Some(batch) = self.pending.take() {
            let report = self.ctx.runtime().block_on(batch.settled());
            println!("Images:\n{}", format_batch_report(&report));
        }
    }

    fn enter_idea(&mut self) -> Result<(), ApiError> {
        let idea: String = Input::new()
            .with_prompt("Idea")
            .with_initial_text(self.orchestrator.snapshot().idea)
            .allow_empty(true)
            .interact_text()
            .map_err(input_error)?;
        self.orchestrator.set_idea(idea);
        Ok(())
    }

    fn choose_tone(&mut self) -> Result<(), ApiError> {
        let current = self.orchestrator.snapshot().tone;
        let labels: Vec<&str> = Tone::ALL.iter().map(|t| t.slug()).collect();
        let index = Select::new()
            .with_prompt("Tone")
            .items(&labels)
            .default(Tone::ALL.iter().position(|t| *t == current).unwrap_or(0))
            .interact()
            .map_err(input_error)?;
        self.orchestrator.set_tone(Tone::ALL[index]);
        Ok(())
    }

    fn generate(&mut self) -> Result<(), ApiError> {
        let snapshot = self.orchestrator.snapshot();
        if !snapshot.can_generate() {
            println!("{}", "Enter an idea and select a key first.".yellow());
            return Ok(());
        }
        println!("Drafting posts...");
        match self.ctx.runtime().block_on(self.orchestrator.generate_current()) {
            GenerateOutcome::Drafted(batch) => {
                println!("{}", format_snapshot_text(&self.orchestrator.snapshot()));
                self.pending = Some(batch);
            }
            GenerateOutcome::Skipped(reason) => debug!(?reason, "Generate skipped"),
            GenerateOutcome::TextFailed { .. } | GenerateOutcome::Locked => {}
        }
        Ok(())
    }

    fn pick_platform(&self, prompt: &str) -> Result<Option<Platform>, ApiError> {
        let labels: Vec<&str> = Platform::ALL.iter().map(|p| p.display_name()).collect();
        let index = Select::new()
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact_opt()
            .map_err(input_error)?;
        Ok(index.map(|i| Platform::ALL[i]))
    }

    fn regenerate(&mut self) -> Result<(), ApiError> {
        let Some(platform) = self.pick_platform("Regenerate which image?")? else {
            return Ok(());
        };
        println!("Regenerating the {} image...", platform);
        match self
            .ctx
            .runtime()
            .block_on(self.orchestrator.regenerate_image(platform))
        {
            RegenerateOutcome::Finished(ImageOutcome::Stored) => {
                if let Some(card) = self
                    .orchestrator
                    .snapshot()
                    .results
                    .as_ref()
                    .and_then(|r| r.get(platform))
                {
                    println!("{}", format_card_text(platform, card));
                }
            }
            RegenerateOutcome::Finished(_) => {}
            RegenerateOutcome::Skipped(SkipReason::InProgress) => {
                println!("The {} image is still generating.", platform)
            }
            RegenerateOutcome::Skipped(_) => println!("{}", "Nothing to regenerate yet.".yellow()),
        }
        Ok(())
    }

    fn edit_hashtags(&mut self) -> Result<(), ApiError> {
        let index = Select::new()
            .with_prompt("Hashtags")
            .items(&["Add a hashtag", "Remove a hashtag"])
            .default(0)
            .interact_opt()
            .map_err(input_error)?;
        match index {
            Some(0) => {
                let raw: String = Input::new()
                    .with_prompt("Hashtag")
                    .allow_empty(true)
                    .interact_text()
                    .map_err(input_error)?;
                match self.orchestrator.add_hashtag(&raw) {
                    Ok(tag) => println!("Added {}", tag),
                    Err(e) => println!("{}", e.to_string().yellow()),
                }
            }
            Some(_) => {
                let tags: Vec<String> = self
                    .orchestrator
                    .snapshot()
                    .results
                    .as_ref()
                    .and_then(|r| r.get(Platform::Instagram))
                    .and_then(|c| c.hashtags.as_ref())
                    .map(|t| t.as_slice().to_vec())
                    .unwrap_or_default();
                if tags.is_empty() {
                    println!("{}", "No hashtags to remove.".yellow());
                    return Ok(());
                }
                let picked = Select::new()
                    .with_prompt("Remove which?")
                    .items(&tags)
                    .interact_opt()
                    .map_err(input_error)?;
                if let Some(i) = picked {
                    if let Ok(Some(removed)) = self.orchestrator.remove_hashtag(i) {
                        println!("Removed {}", removed);
                    }
                }
            }
            None => {}
        }
        Ok(())
    }

    fn with_card<T>(
        &self,
        prompt: &str,
        f: impl FnOnce(Platform, &crate::draft::PlatformResult) -> Result<T, ApiError>,
    ) -> Result<Option<T>, ApiError> {
        let snapshot = self.orchestrator.snapshot();
        let Some(results) = snapshot.results.as_ref() else {
            println!("{}", "No drafts yet.".yellow());
            return Ok(None);
        };
        let Some(platform) = self.pick_platform(prompt)? else {
            return Ok(None);
        };
        match results.get(platform) {
            Some(card) => f(platform, card).map(Some),
            None => Ok(None),
        }
    }

    fn copy(&mut self) -> Result<(), ApiError> {
        let clipboard: &dyn Clipboard = &self.clipboard;
        if self
            .with_card("Copy which post?", |_, card| copy_card(clipboard, card))?
            .is_some()
        {
            println!("Copied to clipboard.");
        }
        Ok(())
    }

    fn share(&mut self) -> Result<(), ApiError> {
        let clipboard: &dyn Clipboard = &self.clipboard;
        let target = self.share_target.as_ref();
        let outcome = self.with_card("Share which post?", |platform, card| {
            share_card(target, clipboard, platform, card).map(|o| (platform, card.shareable_text(), o))
        })?;
        match outcome {
            Some((_, _, ShareOutcome::Shared(paths))) => println!("{}", format_downloads(&paths)),
            Some((platform, text, ShareOutcome::CopiedToClipboard)) => {
                println!("Sharing is not configured; the post was copied instead.");
                if let Some(link) = share_link(platform, &text) {
                    println!("Open {} to post it.", link);
                }
            }
            Some((_, _, ShareOutcome::Cancelled)) | None => {}
        }
        Ok(())
    }

    fn download(&mut self) -> Result<(), ApiError> {
        let dir = self.ctx.config().output.download_dir.clone();
        let saved = self.with_card("Download which image?", |platform, card| {
            card.image
                .as_ref()
                .map(|image| download_image(&dir, platform, image, Utc::now()))
                .transpose()
        })?;
        match saved.flatten() {
            Some(path) => println!("{}", format_downloads(&[path])),
            None => println!("{}", "No image for that post.".yellow()),
        }
        Ok(())
    }

    fn settings(&mut self) -> Result<(), ApiError> {
        let current = self.orchestrator.image_config();
        println!("Current: {}", format_image_config(&current));

        let tiers: Vec<&str> = ResolutionTier::ALL.iter().map(|t| t.as_str()).collect();
        let tier = Select::new()
            .with_prompt("Resolution")
            .items(&tiers)
            .default(
                ResolutionTier::ALL
                    .iter()
                    .position(|t| *t == current.resolution)
                    .unwrap_or(0),
            )
            .interact()
            .map_err(input_error)?;

        let choices = AspectRatioChoice::options();
        let labels: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
        let ratio = Select::new()
            .with_prompt("Aspect ratio")
            .items(&labels)
            .default(choices.iter().position(|c| *c == current.aspect_ratio).unwrap_or(0))
            .interact()
            .map_err(input_error)?;

        let updated = ImageRequestConfig {
            aspect_ratio: choices[ratio],
            resolution: ResolutionTier::ALL[tier],
        };
        self.orchestrator.set_image_config(updated);
        println!("Saved: {}", format_image_config(&updated));
        Ok(())
    }
}
