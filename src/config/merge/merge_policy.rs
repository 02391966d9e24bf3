//! Merge rules: defaults, override order, conflict handling.
//!
//! Layers, lowest to highest: these defaults, the global file, project files,
//! then `POSTCRAFT__*` environment variables. Tables merge key by key; a
//! higher layer only replaces the keys it sets.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("image.aspect_ratio", "auto")?
        .set_default("image.resolution", "1K")?
        .set_default("provider.api_key_env", "GEMINI_API_KEY")?
        .set_default("logging.level", "warn")?
        .set_default("logging.output", "stderr")
}
