//! User settings stored next to the configuration.
//!
//! The settings file is shared with collaborators outside the configuration
//! core, e.g. the remote notifier reads its enabled flag and target URL from
//! here. The core only loads, validates, and saves it.

use std::fs;
use std::path::Path;

use ms_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::store::write_atomic;

/// Settings file name inside the config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

fn default_true() -> bool {
    true
}

/// Remote notifier switch and target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// All user settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub notifier: NotifierSettings,

    /// Keep a timestamped copy of the previous configuration on save.
    #[serde(default = "default_true")]
    pub backup_on_save: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifier: NotifierSettings::default(),
            backup_on_save: true,
        }
    }
}

impl Settings {
    /// Validate the settings values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.notifier.enabled {
            match self.notifier.url.as_deref() {
                None | Some("") => {
                    return Err("notifier is enabled but has no url".to_string());
                }
                Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                    return Err(format!("notifier url must be http(s), got {url}"));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Load settings; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSettings`] when the file parses but [`Settings::validate`]
    /// rejects it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| Error::LoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings
            .validate()
            .map_err(|reason| Error::InvalidSettings {
                path: path.to_path_buf(),
                reason,
            })?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let save_failed = |e: std::io::Error| Error::SaveFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(save_failed)?;
            }
        }
        let text = serde_json::to_string_pretty(self)?;
        write_atomic(path, text.as_bytes()).map_err(save_failed)
    }
}
