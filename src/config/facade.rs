//! Config loading entry points.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::PostcraftConfig;
use crate::error::ApiError;
use config::{ConfigBuilder, Environment, File, Map};
use config::builder::DefaultState;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "POSTCRAFT";
const ENV_SEPARATOR: &str = "__";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file, project files under `project_root`,
    /// then `POSTCRAFT__*` environment overrides.
    pub fn load(project_root: &Path) -> Result<PostcraftConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder, Self::xdg_config_path());
        let builder = workspace_file::add_to_builder(builder, project_root);
        Self::finish(builder, None)
    }

    /// Load defaults and one explicit file, then environment overrides.
    /// The global and project files are not consulted.
    pub fn load_from_file(path: &Path) -> Result<PostcraftConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        Self::finish(builder, None)
    }

    /// Path of the global config file, whether or not it exists.
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Same layering as [`ConfigLoader::load`] with explicit inputs in place
    /// of the process environment.
    pub fn load_with(
        global: Option<PathBuf>,
        project_root: &Path,
        env: Map<String, String>,
    ) -> Result<PostcraftConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder, global);
        let builder = workspace_file::add_to_builder(builder, project_root);
        Self::finish(builder, Some(env))
    }

    fn finish(
        builder: ConfigBuilder<DefaultState>,
        env: Option<Map<String, String>>,
    ) -> Result<PostcraftConfig, ApiError> {
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
