//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::DraftFormat;

pub mod commands;

/// Longform - keep scene trees and their index notes in sync
#[derive(Parser, Debug)]
#[command(name = "longform", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault root (default: nearest ancestor containing .obsidian/)
    #[arg(long, global = true, env = "LONGFORM_VAULT")]
    pub vault: Option<PathBuf>,

    /// Output as JSON (for scripting)
    #[arg(long, alias = "robot", global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover drafts, repair stale index notes, and list them
    Drafts,

    /// Show a draft's numbered scene tree
    Scenes {
        /// Vault path of the draft's index note
        index: String,
    },

    /// Create a new project index note
    New(NewArgs),

    /// Select a draft, or clear the selection
    Select {
        /// Vault path of the draft's index note (omit to clear)
        index: Option<String>,
    },

    /// Indent a scene one level
    Indent {
        /// Vault path of the scene note
        scene: String,
    },

    /// Unindent a scene one level
    Unindent {
        /// Vault path of the scene note
        scene: String,
    },

    /// Create a scene note and add it to a draft
    AddScene(AddSceneArgs),

    /// Print the path of the following scene
    Next(NavigateArgs),

    /// Print the path of the preceding scene
    Prev(NavigateArgs),

    /// Write scene order and number properties onto every scene note
    Renumber,

    /// Watch the vault and keep drafts in sync until interrupted
    Watch,

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Draft format accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// One note holds the whole draft
    Single,
    /// Ordered scene notes next to the index
    #[default]
    Scenes,
}

impl From<FormatArg> for DraftFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Single => Self::Single,
            FormatArg::Scenes => Self::Scenes,
        }
    }
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Vault path of the new index note (must end in .md)
    pub path: String,

    /// Draft format
    #[arg(long, value_enum, default_value_t)]
    pub format: FormatArg,

    /// Project title (default: the note's file name)
    #[arg(long)]
    pub title: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddSceneArgs {
    /// Vault path of the draft's index note
    pub index: String,

    /// Scene title (also its file name)
    pub name: String,

    /// Insert before the scene at this position (0-based)
    #[arg(long, conflicts_with = "after")]
    pub before: Option<usize>,

    /// Insert after the scene at this position (0-based)
    #[arg(long)]
    pub after: Option<usize>,
}

#[derive(Args, Debug)]
pub struct NavigateArgs {
    /// Vault path of the current scene note
    pub scene: String,

    /// Skip scenes at other indent levels
    #[arg(long)]
    pub same_indent: bool,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
