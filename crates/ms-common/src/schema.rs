//! Configuration document format versioning and compatibility.

/// Current format version written into exported configuration documents.
///
/// Follows semver: MAJOR.MINOR.PATCH
/// - MAJOR: Breaking changes (field removals, type changes)
/// - MINOR: Additive changes (new optional fields)
/// - PATCH: Bug fixes, documentation
pub const FORMAT_VERSION: &str = "1.0.0";

fn major(version: &str) -> Option<u32> {
    version.split('.').next().and_then(|s| s.trim().parse().ok())
}

/// Check if a document format version is readable by this build.
///
/// Only the major version has to match.
pub fn is_compatible(version: &str) -> bool {
    match (major(FORMAT_VERSION), major(version)) {
        (Some(current), Some(other)) => current == other,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_major_compatible() {
        assert!(is_compatible("1.0.0"));
        assert!(is_compatible("1.1.0"));
        assert!(is_compatible("1.99.99"));
        assert!(is_compatible("1"));
    }

    #[test]
    fn test_different_major_incompatible() {
        assert!(!is_compatible("0.9.0"));
        assert!(!is_compatible("2.0.0"));
    }

    #[test]
    fn test_garbage_incompatible() {
        assert!(!is_compatible(""));
        assert!(!is_compatible("v1"));
    }
}
