//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;
mod session;

pub use help::{command_name, needs_provider};
pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_batch_report, format_card_text, format_downloads, format_draft_json,
    format_image_config, format_notices, format_ratio_table, format_settings,
    format_snapshot_json, format_snapshot_text,
};
pub use route::RunContext;
