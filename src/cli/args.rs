//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::types::Scope;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Layered OpenCode configuration tool
#[derive(Parser)]
#[command(
    name = "opconf",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect, edit and watch layered OpenCode configuration",
    long_about = "Resolve the six configuration scopes, show the merged result, \
                  patch individual sources without losing comments, and stream \
                  change notifications.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Examples:\n  opconf paths\n  opconf show --sources\n  opconf get tui.scroll_speed\n  opconf set project theme '\"dark\"'\n  opconf unset global provider.openai\n  opconf watch"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show where each scope is read from
    #[command(about = "List the location of every configuration scope")]
    Paths,

    /// Print the merged configuration
    #[command(about = "Print the effective configuration as JSON")]
    Show {
        /// Print a single scope's own document instead of the merge
        #[arg(short, long)]
        scope: Option<Scope>,

        /// Include every contributing source alongside the merge
        #[arg(long, conflicts_with = "scope")]
        sources: bool,
    },

    /// Look up one value in the merged configuration
    #[command(about = "Print one merged value and the scope it came from")]
    Get {
        /// Dotted key path, e.g. `provider.openai.options`
        key: String,
    },

    /// Set a value in one scope's file, keeping comments intact
    #[command(
        about = "Set a value in one scope's configuration file",
        after_help = "VALUE is parsed as JSON; anything that is not valid JSON is stored as a string."
    )]
    Set {
        /// Scope to write (global, custom, project, projectDir)
        scope: Scope,

        /// Dotted key path
        key: String,

        /// New value
        value: String,
    },

    /// Remove a value from one scope's file
    #[command(about = "Remove a key from one scope's configuration file")]
    Unset {
        /// Scope to write
        scope: Scope,

        /// Dotted key path
        key: String,
    },

    /// Replace one scope's document with the contents of a JSON file
    #[command(about = "Replace a scope's document, keeping existing comments")]
    Replace {
        /// Scope to write
        scope: Scope,

        /// JSON or JSONC file holding the new document
        file: PathBuf,
    },

    /// Stream change notifications as JSON lines until interrupted
    #[command(about = "Watch configuration, skill and agent files for changes")]
    Watch {
        /// Debounce window in milliseconds (overrides settings)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// List discovered skills
    #[command(about = "List skills visible from the current directory")]
    Skills,

    /// List discovered agents
    #[command(about = "List agents visible from the current directory")]
    Agents,

    /// Validate the merged configuration against a JSON Schema
    #[command(about = "Validate the effective configuration")]
    Validate {
        /// Schema file (overrides settings)
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Show tool settings
    #[command(about = "Display active settings from settings.toml")]
    Config,
}
