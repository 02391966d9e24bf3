//! User-facing notifications raised by the orchestrator.

use crate::draft::Platform;
use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Fatal authorization failure; a paid, billing-enabled key is required.
    BillingRequired { detail: String },
    /// One-shot generic failure of the text phase.
    TextGenerationFailed { detail: String },
    /// A non-fatal image failure, for surfaces that want to show it.
    ImageGenerationFailed { platform: Platform, detail: String },
    /// The key-selection flow succeeded and generation is unlocked.
    Reauthorized,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::BillingRequired { detail } => format!(
                "Image and text generation require an API key from a project with billing enabled. \
                 Select a different key to continue. ({})",
                detail
            ),
            Notice::TextGenerationFailed { .. } => {
                "Failed to generate posts. Please try again.".to_string()
            }
            Notice::ImageGenerationFailed { platform, .. } => {
                format!("Failed to generate the {} image.", platform)
            }
            Notice::Reauthorized => "API key updated.".to_string(),
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Notice::BillingRequired { .. })
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log only.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        if notice.is_alert() {
            warn!(alert = true, "{}", notice.message());
        } else {
            info!("{}", notice.message());
        }
    }
}

/// Collects notices so a surface can show them after the fact.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    pub fn alert_count(&self) -> usize {
        self.notices.lock().iter().filter(|n| n.is_alert()).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
