//! Modsync command-line tool.
//!
//! The `modsync` binary loads the active module configuration, imports and
//! exports configuration documents, and checks the schema registry for
//! drift. This library holds the CLI definition and command handlers so
//! they can be tested without spawning a process.

pub mod cli;
pub mod commands;
pub mod exit_codes;
pub mod logging;

pub use cli::Cli;
pub use exit_codes::ExitCode;
