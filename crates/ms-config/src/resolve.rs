//! Path resolution for the configuration and settings files.
//!
//! Precedence (highest to lowest):
//!
//! 1. CLI flag
//! 2. Environment variable (`MODSYNC_CONFIG`, `MODSYNC_SETTINGS`)
//! 3. XDG config dir (`~/.config/modsync/…`)
//! 4. Current directory

use std::fmt;
use std::path::{Path, PathBuf};

use crate::settings::SETTINGS_FILE_NAME;
use crate::store::CONFIG_FILE_NAME;

/// Environment override for the configuration file.
pub const CONFIG_ENV: &str = "MODSYNC_CONFIG";

/// Environment override for the settings file.
pub const SETTINGS_ENV: &str = "MODSYNC_SETTINGS";

/// Directory name under the platform config dir.
pub const CONFIG_DIR_NAME: &str = "modsync";

/// Where a resolved path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSource {
    CliFlag,
    EnvVar(&'static str),
    ConfigDir,
    CurrentDir,
}

impl fmt::Display for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSource::CliFlag => write!(f, "cli"),
            PathSource::EnvVar(name) => write!(f, "env:{name}"),
            PathSource::ConfigDir => write!(f, "config-dir"),
            PathSource::CurrentDir => write!(f, "cwd"),
        }
    }
}

/// A resolved path with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub source: PathSource,
}

/// Resolved file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config: ResolvedPath,
    pub settings: ResolvedPath,
}

fn resolve_one(
    cli: Option<&Path>,
    env_name: &'static str,
    file_name: &str,
    env: &impl Fn(&str) -> Option<String>,
    config_dir: Option<&Path>,
) -> ResolvedPath {
    if let Some(path) = cli {
        return ResolvedPath {
            path: path.to_path_buf(),
            source: PathSource::CliFlag,
        };
    }
    if let Some(value) = env(env_name).filter(|v| !v.trim().is_empty()) {
        return ResolvedPath {
            path: PathBuf::from(value),
            source: PathSource::EnvVar(env_name),
        };
    }
    match config_dir {
        Some(dir) => ResolvedPath {
            path: dir.join(CONFIG_DIR_NAME).join(file_name),
            source: PathSource::ConfigDir,
        },
        None => ResolvedPath {
            path: PathBuf::from(file_name),
            source: PathSource::CurrentDir,
        },
    }
}

/// Resolve paths with injectable environment and config dir.
pub fn resolve_with(
    cli_config: Option<&Path>,
    cli_settings: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    config_dir: Option<&Path>,
) -> ConfigPaths {
    ConfigPaths {
        config: resolve_one(cli_config, CONFIG_ENV, CONFIG_FILE_NAME, &env, config_dir),
        settings: resolve_one(
            cli_settings,
            SETTINGS_ENV,
            SETTINGS_FILE_NAME,
            &env,
            config_dir,
        ),
    }
}

/// Resolve paths from the process environment and the platform config dir.
pub fn resolve_config(cli_config: Option<&Path>, cli_settings: Option<&Path>) -> ConfigPaths {
    let config_dir = dirs::config_dir();
    resolve_with(
        cli_config,
        cli_settings,
        |name| std::env::var(name).ok(),
        config_dir.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_cli_beats_env() {
        let paths = resolve_with(
            Some(Path::new("/cli/modules.json")),
            None,
            |_| Some("/env/file.json".to_string()),
            Some(Path::new("/home/u/.config")),
        );
        assert_eq!(paths.config.path, PathBuf::from("/cli/modules.json"));
        assert_eq!(paths.config.source, PathSource::CliFlag);
        assert_eq!(paths.settings.path, PathBuf::from("/env/file.json"));
        assert_eq!(paths.settings.source, PathSource::EnvVar(SETTINGS_ENV));
    }

    #[test]
    fn test_env_beats_config_dir() {
        let paths = resolve_with(
            None,
            None,
            |name| (name == CONFIG_ENV).then(|| "/env/modules.json".to_string()),
            Some(Path::new("/home/u/.config")),
        );
        assert_eq!(paths.config.source, PathSource::EnvVar(CONFIG_ENV));
        assert_eq!(
            paths.settings.path,
            PathBuf::from("/home/u/.config/modsync/settings.json")
        );
        assert_eq!(paths.settings.source, PathSource::ConfigDir);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let paths = resolve_with(
            None,
            None,
            |_| Some("  ".to_string()),
            Some(Path::new("/cfg")),
        );
        assert_eq!(paths.config.path, PathBuf::from("/cfg/modsync/modules.json"));
    }

    #[test]
    fn test_no_config_dir_falls_back_to_cwd() {
        let paths = resolve_with(None, None, no_env, None);
        assert_eq!(paths.config.path, PathBuf::from("modules.json"));
        assert_eq!(paths.config.source, PathSource::CurrentDir);
        assert_eq!(paths.config.source.to_string(), "cwd");
    }
}
