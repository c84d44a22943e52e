//! Exit codes for the modsync CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing.
//! They are stable; scripts may branch on them.

use ms_common::Error;

/// Exit codes for modsync operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success / nothing to report
    Clean = 0,

    /// Field lists and schema template disagree
    SchemaDrift = 1,

    /// Configuration document or settings could not be understood
    ConfigError = 10,

    /// Import had nothing to import
    ImportEmpty = 11,

    /// Named module or variable does not exist
    NotFound = 12,

    /// Reading or writing a file failed
    IoError = 13,

    /// Internal/unknown error.
    ///
    /// Reserved: no [`Error`] variant maps here. The value stays allocated so
    /// scripts can tell an unexpected failure apart from the codes above.
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    ///
    /// Drift is a diagnostic, not a failure of the command itself.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::SchemaDrift)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Map a failed operation onto its exit code.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::MalformedConfig { .. }
            | Error::DuplicateName { .. }
            | Error::UnsupportedFormatVersion(_)
            | Error::InvalidSettings { .. }
            | Error::Json(_) => ExitCode::ConfigError,
            Error::ImportEmpty => ExitCode::ImportEmpty,
            Error::ModuleNotFound { .. } | Error::VariableNotFound { .. } => ExitCode::NotFound,
            Error::LoadFailed { .. } | Error::SaveFailed { .. } | Error::Io(_) => {
                ExitCode::IoError
            }
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_success_and_error_bands() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::SchemaDrift.is_success());
        assert!(!ExitCode::SchemaDrift.is_error());
        assert!(ExitCode::ConfigError.is_error());
        assert!(ExitCode::InternalError.is_error());
        assert_eq!(i32::from(ExitCode::IoError), 13);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ExitCode::from_error(&Error::malformed("x")),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::from_error(&Error::UnsupportedFormatVersion("9.0.0".into())),
            ExitCode::ConfigError
        );
        assert_eq!(ExitCode::from_error(&Error::ImportEmpty), ExitCode::ImportEmpty);
        assert_eq!(
            ExitCode::from_error(&Error::ModuleNotFound { name: "A".into() }),
            ExitCode::NotFound
        );
        assert_eq!(
            ExitCode::from_error(&Error::SaveFailed {
                path: PathBuf::from("/x"),
                reason: "denied".into(),
            }),
            ExitCode::IoError
        );
        assert_eq!(
            ExitCode::from_error(&Error::InvalidSettings {
                path: PathBuf::from("settings.json"),
                reason: "notifier is enabled but has no url".into(),
            }),
            ExitCode::ConfigError
        );
    }

    #[test]
    fn test_internal_error_is_reserved() {
        let errors = [
            Error::malformed("x"),
            Error::ImportEmpty,
            Error::DuplicateName {
                kind: "module",
                name: "A".into(),
            },
            Error::UnsupportedFormatVersion("2.0.0".into()),
            Error::LoadFailed {
                path: PathBuf::from("/x"),
                reason: "gone".into(),
            },
            Error::VariableNotFound {
                module: "A".into(),
                variable: "v".into(),
            },
            Error::Io(std::io::Error::other("boom")),
        ];
        for err in &errors {
            assert_ne!(ExitCode::from_error(err), ExitCode::InternalError, "{err}");
        }
        assert_eq!(ExitCode::InternalError.as_i32(), 99);
        assert!(ExitCode::InternalError.is_error());
    }
}
