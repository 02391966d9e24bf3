//! Copy, share and download actions for result cards.
//!
//! Sharing goes through a [`ShareTarget`]. A target that reports
//! [`ApiError::ShareUnsupported`] falls back to a clipboard copy, a user
//! cancellation is swallowed, and anything else is handed back to the caller.

use crate::draft::{Platform, PlatformResult};
use crate::error::ApiError;
use crate::image::ImageReference;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Url;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destination for copied text.
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<(), ApiError>;
}

/// OSC 52 escape sequence that asks the terminal to set its clipboard.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text.as_bytes()))
}

/// Clipboard backed by the terminal's OSC 52 support.
pub struct TerminalClipboard<W: Write + Send> {
    out: Mutex<W>,
}

impl TerminalClipboard<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalClipboard<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> Clipboard for TerminalClipboard<W> {
    fn copy(&self, text: &str) -> Result<(), ApiError> {
        let mut out = self.out.lock();
        out.write_all(osc52_sequence(text).as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| ApiError::ClipboardError(e.to_string()))?;
        debug!(bytes = text.len(), "Copied to terminal clipboard");
        Ok(())
    }
}

/// What a share target receives.
#[derive(Debug, Clone, Copy)]
pub struct SharePayload<'a> {
    pub platform: Platform,
    pub text: &'a str,
    pub image: Option<&'a ImageReference>,
}

pub trait ShareTarget: Send + Sync {
    /// Returns the locations written, if any.
    fn share(&self, payload: &SharePayload<'_>) -> Result<Vec<PathBuf>, ApiError>;
}

/// Used when no share destination is configured.
#[derive(Debug, Default)]
pub struct NoShareTarget;

impl ShareTarget for NoShareTarget {
    fn share(&self, _payload: &SharePayload<'_>) -> Result<Vec<PathBuf>, ApiError> {
        Err(ApiError::ShareUnsupported)
    }
}

/// Writes the card's text and image into an outbox directory.
#[derive(Debug, Clone)]
pub struct DirectoryShare {
    dir: PathBuf,
}

impl DirectoryShare {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ShareTarget for DirectoryShare {
    fn share(&self, payload: &SharePayload<'_>) -> Result<Vec<PathBuf>, ApiError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ApiError::ShareFailed(format!("{}: {}", self.dir.display(), e)))?;
        let now = Utc::now();
        let mut written = Vec::new();

        let text_path = unique_path(&self.dir, payload.platform, now, "txt");
        fs::write(&text_path, payload.text)
            .map_err(|e| ApiError::ShareFailed(format!("{}: {}", text_path.display(), e)))?;
        written.push(text_path);

        if let Some(image) = payload.image {
            let path = unique_path(&self.dir, payload.platform, now, image.file_extension());
            fs::write(&path, image.decode()?)
                .map_err(|e| ApiError::ShareFailed(format!("{}: {}", path.display(), e)))?;
            written.push(path);
        }

        info!(
            platform = %payload.platform.slug(),
            files = written.len(),
            dir = %self.dir.display(),
            "Card shared to outbox"
        );
        Ok(written)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared(Vec<PathBuf>),
    /// The target could not share, so the text went to the clipboard instead.
    CopiedToClipboard,
    Cancelled,
}

/// Copy the card's text (hashtags appended) to the clipboard.
pub fn copy_card(clipboard: &dyn Clipboard, card: &PlatformResult) -> Result<(), ApiError> {
    clipboard.copy(&card.shareable_text())
}

/// Share one card, falling back to the clipboard when sharing is unsupported.
pub fn share_card(
    target: &dyn ShareTarget,
    clipboard: &dyn Clipboard,
    platform: Platform,
    card: &PlatformResult,
) -> Result<ShareOutcome, ApiError> {
    let text = card.shareable_text();
    let payload = SharePayload {
        platform,
        text: &text,
        image: card.image.as_ref(),
    };
    match target.share(&payload) {
        Ok(paths) => Ok(ShareOutcome::Shared(paths)),
        Err(ApiError::ShareUnsupported) => {
            debug!(platform = %platform.slug(), "Share unsupported; copying instead");
            clipboard.copy(&text)?;
            Ok(ShareOutcome::CopiedToClipboard)
        }
        Err(ApiError::ShareCancelled) => Ok(ShareOutcome::Cancelled),
        Err(e) => Err(e),
    }
}

/// Decode the image and write it as `<platform>-<timestamp>.<ext>` under `dir`.
pub fn download_image(
    dir: &Path,
    platform: Platform,
    image: &ImageReference,
    now: DateTime<Utc>,
) -> Result<PathBuf, ApiError> {
    let bytes = image.decode()?;
    fs::create_dir_all(dir)?;
    let path = unique_path(dir, platform, now, image.file_extension());
    fs::write(&path, bytes)?;
    info!(platform = %platform.slug(), path = %path.display(), "Image downloaded");
    Ok(path)
}

/// Web share link carrying the text, for platforms that have one.
pub fn share_link(platform: Platform, text: &str) -> Option<String> {
    let (base, param) = platform.profile().share_intent?;
    Url::parse_with_params(base, &[(param, text)])
        .ok()
        .map(String::from)
}

fn file_stem(platform: Platform, now: DateTime<Utc>) -> String {
    format!("{}-{}", platform.slug(), now.format("%Y%m%d-%H%M%S"))
}

// Same-second writes get a numeric suffix instead of overwriting.
fn unique_path(dir: &Path, platform: Platform, now: DateTime<Utc>, ext: &str) -> PathBuf {
    let stem = file_stem(platform, now);
    let mut path = dir.join(format!("{}.{}", stem, ext));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}-{}.{}", stem, n, ext));
        n += 1;
    }
    path
}
