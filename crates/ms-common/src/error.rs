//! Error types for modsync.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for modsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for modsync.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration shape errors (10-19)
    #[error("malformed configuration: {reason}")]
    MalformedConfig { reason: String },

    #[error("nothing to import: imported configuration is empty or absent")]
    ImportEmpty,

    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("unsupported configuration format version: {0}")]
    UnsupportedFormatVersion(String),

    #[error("invalid settings in {}: {reason}", path.display())]
    InvalidSettings { path: PathBuf, reason: String },

    // Persistence errors (20-29)
    #[error("failed to load {}: {reason}", path.display())]
    LoadFailed { path: PathBuf, reason: String },

    #[error("failed to save {}: {reason}", path.display())]
    SaveFailed { path: PathBuf, reason: String },

    // Lookup errors (30-39)
    #[error("module not found: {name}")]
    ModuleNotFound { name: String },

    #[error("variable {variable} not found in module {module}")]
    VariableNotFound { module: String, variable: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::MalformedConfig`] with the given reason.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedConfig {
            reason: reason.into(),
        }
    }

    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::MalformedConfig { .. } => 10,
            Error::ImportEmpty => 11,
            Error::DuplicateName { .. } => 12,
            Error::UnsupportedFormatVersion(_) => 13,
            Error::InvalidSettings { .. } => 14,
            Error::LoadFailed { .. } => 20,
            Error::SaveFailed { .. } => 21,
            Error::ModuleNotFound { .. } => 30,
            Error::VariableNotFound { .. } => 31,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Whether this error describes the shape of a configuration document
    /// (as opposed to a storage failure).
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedConfig { .. }
                | Error::DuplicateName { .. }
                | Error::UnsupportedFormatVersion(_)
        )
    }
}
