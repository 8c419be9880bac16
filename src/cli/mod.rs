//! CLI argument definitions and command dispatch.

use clap::{Parser, Subcommand, ValueEnum};

/// Systweak CLI - snapshot-based system tweak management.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "st", version, about, long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)] // CLI flags naturally use multiple bools
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "ST_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose output (repeat for more detail)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Catalog ===
    /// List available tweaks
    List(ListArgs),

    /// Show one tweak's definition in detail
    Show(ShowArgs),

    // === Apply & Restore ===
    /// Apply one or more tweaks (captures a snapshot first)
    Apply(ApplyArgs),

    /// Restore the last snapshot (all subsystems, or one)
    Restore(RestoreArgs),

    /// Show applied tweaks and available backups
    Status,

    // === Startup Items ===
    /// Enable or disable startup items
    #[command(subcommand)]
    Startup(StartupCommands),

    // === Utilities ===
    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list tweaks in this category (gaming, network, privacy, power)
    #[arg(long, short = 'c')]
    pub category: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Tweak id (e.g. gaming.game-dvr-off)
    pub id: String,
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Tweak ids to apply as one batch
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct RestoreArgs {
    /// Restore only this category's snapshot (default: all)
    #[arg(long, short = 'c')]
    pub category: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum StartupCommands {
    /// Show where a startup item currently lives
    Status(StartupItemArgs),

    /// Disable startup items (moves them to the side path)
    Disable(StartupItemsArgs),

    /// Re-enable startup items
    Enable(StartupItemsArgs),
}

#[derive(Parser, Debug)]
pub struct StartupItemArgs {
    /// Startup item name
    pub name: String,
}

#[derive(Parser, Debug)]
pub struct StartupItemsArgs {
    /// Startup item names
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
