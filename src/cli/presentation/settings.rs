//! Settings and aspect-ratio table formatters.

use crate::config::PostcraftConfig;
use crate::draft::Platform;
use crate::error::ApiError;
use crate::image::{AspectRatioChoice, ImageRequestConfig};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_settings(config: &PostcraftConfig, key_hint: Option<&str>) -> Result<String, ApiError> {
    let body = config
        .to_toml()
        .map_err(|e| ApiError::ConfigError(format!("Failed to render configuration: {}", e)))?;
    let key = match key_hint {
        Some(masked) => format!("{} {}", "API key:".bold(), masked),
        None => format!("{} {}", "API key:".bold(), "not set".yellow()),
    };
    Ok(format!("{}\n\n{}", key, body.trim_end()))
}

/// Every selectable ratio against what is sent for each platform.
pub fn format_ratio_table(platform: Option<Platform>) -> String {
    let platforms: Vec<Platform> = match platform {
        Some(p) => vec![p],
        None => Platform::ALL.to_vec(),
    };
    let mut header = vec!["Selected".to_string()];
    header.extend(platforms.iter().map(|p| p.display_name().to_string()));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header);
    for choice in AspectRatioChoice::options() {
        let config = ImageRequestConfig {
            aspect_ratio: choice,
            ..ImageRequestConfig::default()
        };
        let mut row = vec![choice.to_string()];
        row.extend(
            platforms
                .iter()
                .map(|p| config.resolve_for(*p).aspect_ratio.to_string()),
        );
        table.add_row(row);
    }
    table.to_string()
}

/// Short one-line description of the current image settings.
pub fn format_image_config(config: &ImageRequestConfig) -> String {
    format!(
        "aspect ratio {}, resolution {}",
        config.aspect_ratio.bold(),
        config.resolution.bold()
    )
}
