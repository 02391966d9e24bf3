//! CLI presentation: text and json formatters per command family.

mod cards;
mod settings;

pub use cards::{
    format_batch_report, format_card_text, format_downloads, format_draft_json, format_notices,
    format_snapshot_json, format_snapshot_text,
};
pub use settings::{format_image_config, format_ratio_table, format_settings};
