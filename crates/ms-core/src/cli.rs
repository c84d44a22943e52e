//! Command-line surface of `modsync`.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use ms_common::OutputFormat;

/// Import, export, and check module configurations.
#[derive(Parser, Debug)]
#[command(name = "modsync", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (overrides MODSYNC_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Settings file (overrides MODSYNC_SETTINGS)
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Raise log verbosity (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the current configuration
    Show,
    /// Write the current configuration as a document
    Export {
        /// Output file path (`-` for stdout)
        output: String,
    },
    /// Read a document and merge it into the current configuration
    Import {
        /// Input file path (`-` for stdin)
        input: String,
        /// Replace the current configuration instead of merging
        #[arg(long)]
        replace: bool,
        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Inspect the field lists and schema template
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Identifier helpers
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },
    /// Enable a module or one of its variables
    Enable(ToggleArgs),
    /// Disable a module or one of its variables
    Disable(ToggleArgs),
}

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// Print the structured schema template
    Template,
    /// Print the flat field lists
    Fields,
    /// Compare the field lists with the template
    Check,
}

#[derive(Subcommand, Debug)]
pub enum IdCommands {
    /// Rewrite a letters-then-digits identifier as digits
    Normalize { id: String },
    /// Zero-pad a numeric identifier by magnitude
    Format { value: String },
    /// Sort key combining normalize and format
    Key { value: String },
}

#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Module name
    pub module: String,
    /// Toggle this variable instead of the module
    #[arg(long, value_name = "VAR")]
    pub variable: Option<String>,
}
