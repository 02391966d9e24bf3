//! CLI parse: clap types for Postcraft. No behavior; definitions only.

use crate::draft::{Platform, Tone};
use crate::image::{AspectRatioChoice, ResolutionTier};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Postcraft CLI - draft social posts and illustrations from one idea
#[derive(Parser)]
#[command(name = "postcraft")]
#[command(about = "Draft LinkedIn, Twitter, Instagram and Facebook posts with matching images")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory holding config/config.toml
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Configuration file path (replaces global and project config files)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one set of drafts and images, then print the cards
    Draft {
        /// The idea to write about
        #[arg(long)]
        idea: String,

        /// Voice preset (professional, witty, urgent)
        #[arg(long, default_value = "professional")]
        tone: Tone,

        /// Aspect ratio for every image (auto, 1:1, 2:3, 3:2, 3:4, 4:3, 9:16, 16:9, 21:9)
        #[arg(long)]
        aspect_ratio: Option<AspectRatioChoice>,

        /// Image resolution (1K, 2K, 4K)
        #[arg(long)]
        resolution: Option<ResolutionTier>,

        /// Download generated images into this directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Interactive drafting session
    Session,
    /// Print the effective configuration
    Settings,
    /// Print how each aspect ratio is sent to the image model
    Ratios {
        /// Resolve `auto` for this platform instead of listing all
        #[arg(long)]
        platform: Option<Platform>,
    },
}
