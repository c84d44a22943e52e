//! On-disk storage for the active configuration.
//!
//! Storage failures surface as [`Error::LoadFailed`] / [`Error::SaveFailed`];
//! shape problems in the stored document surface unchanged from
//! [`codec::deserialize`], so callers can tell the two apart.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ms_common::{Error, Result};
use tracing::{debug, info};

use crate::codec;
use crate::model::Configuration;

/// Configuration file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "modules.json";

/// File-backed configuration store.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    backup_on_save: bool,
}

impl ConfigStore {
    /// Create a store for the given file. Backups are on by default.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_on_save: true,
        }
    }

    /// Enable or disable the backup copy written before each save.
    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.backup_on_save = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored configuration. A missing file is an empty
    /// configuration.
    pub fn load(&self) -> Result<Configuration> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no stored configuration, starting empty");
            return Ok(Configuration::default());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| Error::LoadFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        if text.trim().is_empty() {
            return Ok(Configuration::default());
        }
        codec::deserialize(&text)
    }

    /// Write the configuration, backing up the previous file first when
    /// enabled. Returns the backup path, if one was written.
    pub fn save(&self, configuration: &Configuration) -> Result<Option<PathBuf>> {
        let text = codec::serialize(configuration)?;
        let save_failed = |e: std::io::Error| Error::SaveFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(save_failed)?;
            }
        }

        let backup = if self.backup_on_save && self.path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup).map_err(save_failed)?;
            debug!(path = %backup.display(), "wrote backup");
            Some(backup)
        } else {
            None
        };

        write_atomic(&self.path, text.as_bytes()).map_err(save_failed)?;
        info!(
            path = %self.path.display(),
            modules = configuration.modules.len(),
            "configuration saved"
        );
        Ok(backup)
    }

    /// `modules.json` → `modules.bk-<unix-millis>.json`, with a `-N` suffix
    /// when that name is already taken.
    fn backup_path(&self) -> PathBuf {
        let ext = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("json");
        let stamp = chrono::Utc::now().timestamp_millis();
        let mut candidate = self.path.with_extension(format!("bk-{stamp}.{ext}"));
        let mut n = 1;
        while candidate.exists() {
            candidate = self.path.with_extension(format!("bk-{stamp}-{n}.{ext}"));
            n += 1;
        }
        candidate
    }
}

/// Write through a sibling `.tmp` file and rename it into place, so readers
/// see either the old contents or the new ones.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let tmp_path = path.with_extension(format!("{ext}.tmp"));

    let written = (|| {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(contents)?;
        file.flush()?;
        fs::rename(&tmp_path, path)
    })();
    if written.is_err() && tmp_path.is_file() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}
