//! Settings persistence
//!
//! `SettingsStore` owns one settings record and serializes every file
//! access through a single I/O guard. Loading never fails: a missing or
//! unreadable file falls back to the current values with `enable_settings`
//! cleared. Saving reports its errors to the caller.

use std::io::Write;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::schema::PersistentSettings;

/// File name used by the process-wide store
pub const SETTINGS_FILE_NAME: &str = "camstash-settings.xml";

lazy_static! {
    static ref INSTANCE: SettingsStore = SettingsStore::new(SETTINGS_FILE_NAME);
}

/// Settings I/O errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

/// What `SettingsStore::load` found on disk
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The file was read and every field replaced
    Loaded,
    /// No settings file; defaults stay in effect
    Missing,
    /// The file could not be parsed
    Invalid(String),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded)
    }
}

/// A settings record bound to a file on disk
pub struct SettingsStore {
    path: PathBuf,
    settings: RwLock<PersistentSettings>,
    file_io: Mutex<()>,
}

impl SettingsStore {
    /// Create a store with default settings for the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: RwLock::new(PersistentSettings::default()),
            file_io: Mutex::new(()),
        }
    }

    /// The process-wide store, backed by `SETTINGS_FILE_NAME` in the
    /// working directory
    pub fn instance() -> &'static SettingsStore {
        &INSTANCE
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current record
    pub fn snapshot(&self) -> PersistentSettings {
        self.settings.read().clone()
    }

    /// Modify the record in place
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut PersistentSettings),
    {
        f(&mut self.settings.write());
    }

    /// Restore defaults in memory. The file is left untouched.
    pub fn reset(&self) {
        *self.settings.write() = PersistentSettings::default();
    }

    /// Replace the record with the contents of the settings file
    pub fn load(&self) -> LoadOutcome {
        let _guard = self.file_io.lock();

        match self.read_file() {
            Ok(loaded) => {
                *self.settings.write() = loaded;
                tracing::debug!("Loaded settings from {:?}", self.path);
                LoadOutcome::Loaded
            }
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                self.settings.write().enable_settings = false;
                tracing::debug!(
                    "{:?} is not found. Default settings will be used.",
                    self.path
                );
                LoadOutcome::Missing
            }
            Err(e) => {
                self.settings.write().enable_settings = false;
                tracing::warn!(
                    "Unable to parse {:?}, default settings will be used: {}",
                    self.path,
                    e
                );
                LoadOutcome::Invalid(e.to_string())
            }
        }
    }

    /// Write the current record to the settings file.
    ///
    /// The document is written to a temporary file in the same directory and
    /// renamed over the target, so readers see either the old or the new file.
    pub fn save(&self) -> Result<(), SettingsError> {
        let _guard = self.file_io.lock();

        let xml = self.settings.read().to_xml()?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(xml.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!("Saved settings to {:?}", self.path);
        Ok(())
    }

    fn read_file(&self) -> Result<PersistentSettings, SettingsError> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(PersistentSettings::from_xml(&content)?)
    }
}
