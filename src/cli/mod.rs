//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Job Backup CLI - Export and restore job/folder definitions between instances
#[derive(Parser, Debug)]
#[command(name = "job-backup", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Instance home directory (default: $JENKINS_HOME, then ~/.jenkins)
    #[arg(long, global = true, env = "JOB_BACKUP_HOME")]
    pub home: Option<PathBuf>,

    /// Import sessions directory (default: <home>/job-backup/import)
    #[arg(long, global = true, env = "JOB_BACKUP_SESSIONS_DIR")]
    pub sessions_dir: Option<PathBuf>,

    /// Treat the home as having no folder type (folders cannot be created)
    #[arg(long, global = true)]
    pub no_folders: bool,

    /// Output as JSON
    #[arg(long, global = true)]
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
    /// List exportable items as a tree (folders inferred from paths included)
    List,

    /// Export selected items and everything below them to a zip archive
    Export {
        /// Full names or folder prefixes to export
        #[arg(required = true)]
        selection: Vec<String>,

        /// Output file (default: job-backup-<timestamp>.zip)
        #[arg(short, long, conflicts_with = "out_dir")]
        output: Option<PathBuf>,

        /// Directory for the default-named output file
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Import an archive in steps: upload, preview, apply
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },

    /// Import session management
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Import Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Upload and extract an archive into a new session
    Upload {
        /// Archive produced by `job-backup export`
        archive: PathBuf,
    },

    /// Show the items in a session and whether they already exist
    Preview {
        /// Session ID printed by `import upload`
        session: String,
    },

    /// Apply selected items from a session
    Apply {
        /// Session ID printed by `import upload`
        session: String,

        /// Full names or folder prefixes to apply
        #[arg(required = true)]
        selection: Vec<String>,

        /// Show what would be created or updated without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the last apply result of a session
    Result {
        /// Session ID printed by `import upload`
        session: String,
    },
}

// ============================================================================
// Session Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List import sessions
    List,

    /// Delete an import session
    Delete {
        /// Session ID
        id: String,
    },

    /// Delete import sessions older than a given age
    Prune {
        /// Maximum age in hours
        #[arg(long, default_value = "24")]
        older_than_hours: u32,
    },
}
