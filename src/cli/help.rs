//! CLI command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name string for log events (e.g. "draft", "session").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Draft { .. } => "draft",
        Commands::Session => "session",
        Commands::Settings => "settings",
        Commands::Ratios { .. } => "ratios",
    }
}

/// Whether the command talks to the generation provider.
pub fn needs_provider(command: &Commands) -> bool {
    matches!(command, Commands::Draft { .. } | Commands::Session)
}
