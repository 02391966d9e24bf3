//! Result cards: text and JSON renderings of an [`AppSnapshot`].

use crate::auth::AuthState;
use crate::draft::{Platform, PlatformResult};
use crate::error::ApiError;
use crate::orchestrator::{AppSnapshot, BatchReport, ImageOutcome, Notice};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::PathBuf;

const CARD_WIDTH: u16 = 88;

fn image_cell(card: &PlatformResult) -> String {
    match (&card.image, card.image_loading) {
        (_, true) => "generating...".to_string(),
        (Some(image), false) => format!(
            "{} ({} KB)",
            image.mime_type(),
            image.approx_size_bytes().div_ceil(1024)
        ),
        (None, false) => "no image".to_string(),
    }
}

/// One table per platform card.
pub fn format_card_text(platform: Platform, card: &PlatformResult) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(CARD_WIDTH)
        .set_header(vec![platform.display_name().to_string(), image_cell(card)]);
    table.add_row(vec!["Post", card.text.as_str()]);
    if let Some(tags) = &card.hashtags {
        let numbered: Vec<String> = tags
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, tag)| format!("[{}] {}", i, tag))
            .collect();
        let cell = if numbered.is_empty() {
            "-".to_string()
        } else {
            numbered.join("  ")
        };
        table.add_row(vec!["Hashtags".to_string(), cell]);
    }
    table.add_row(vec!["Image prompt", card.image_prompt.as_str()]);
    table.to_string()
}

/// All cards, or the reason they are hidden.
pub fn format_snapshot_text(snapshot: &AppSnapshot) -> String {
    match snapshot.auth {
        AuthState::Locked => {
            return format!(
                "{}",
                "Generation is locked until a billing-enabled API key is selected."
                    .red()
                    .bold()
            )
        }
        AuthState::Unauthorized => {
            return format!("{}", "No API key selected.".yellow())
        }
        AuthState::Authorized => {}
    }
    let Some(results) = &snapshot.results else {
        return format!("{}", "No drafts yet.".dimmed());
    };
    let mut out = format!(
        "{} {} {}\n",
        "Idea:".bold(),
        snapshot.idea,
        format!("({})", snapshot.tone).dimmed()
    );
    for (platform, card) in results.iter() {
        out.push('\n');
        out.push_str(&format_card_text(platform, card));
        out.push('\n');
    }
    out
}

pub fn format_snapshot_json(snapshot: &AppSnapshot) -> Result<String, ApiError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Summary line per platform for a settled batch.
pub fn format_batch_report(report: &BatchReport) -> String {
    let mut lines = Vec::new();
    for (platform, outcome) in &report.outcomes {
        let status = match outcome {
            ImageOutcome::Stored => format!("{}", "image ready".green()),
            ImageOutcome::Failed { detail, .. } => format!("{} {}", "failed:".red(), detail),
            ImageOutcome::Skipped => format!("{}", "skipped".yellow()),
            ImageOutcome::Stale => format!("{}", "discarded".dimmed()),
        };
        lines.push(format!("  {:<10} {}", platform.display_name(), status));
    }
    lines.join("\n")
}

pub fn format_notices(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|notice| {
            if notice.is_alert() {
                format!("{} {}", "!".red().bold(), notice.message())
            } else {
                format!("{} {}", "-".dimmed(), notice.message())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_downloads(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("Saved {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Draft command JSON: snapshot, batch outcomes and notices in one document.
pub fn format_draft_json(
    snapshot: &AppSnapshot,
    report: Option<&BatchReport>,
    notices: &[Notice],
    downloads: &[PathBuf],
) -> Result<String, ApiError> {
    let value = json!({
        "snapshot": snapshot,
        "images": report,
        "notices": notices.iter().map(|n| json!({
            "alert": n.is_alert(),
            "message": n.message(),
        })).collect::<Vec<_>>(),
        "downloads": downloads,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}
