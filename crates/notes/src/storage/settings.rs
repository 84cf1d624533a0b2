//! Settings persistence

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::traits::SettingsStore;
use crate::config::{SETTINGS_FILE, SyncSettings};

/// Settings stored as pretty JSON on disk
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (~/.config/notepull/settings.json)
    pub fn default_location() -> Result<Self> {
        let dir = config::ensure_config_dir()?;
        Ok(Self::new(dir.join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings from this store's file, or defaults when it doesn't exist yet
    pub fn load(&self) -> Result<SyncSettings> {
        SyncSettings::from_file(&self.path)
    }
}

impl SettingsStore for JsonSettingsStore {
    fn save(&self, settings: &SyncSettings) -> Result<()> {
        config::save_json_file(&self.path, settings)
            .with_context(|| format!("Failed to save settings to {}", self.path.display()))
    }
}

/// Records every save; for tests and hosts that persist settings themselves
#[derive(Default)]
pub struct InMemorySettingsStore {
    saved: RwLock<Vec<SyncSettings>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saves so far
    pub fn save_count(&self) -> usize {
        self.saved.read().unwrap().len()
    }

    /// Most recently saved settings
    pub fn last(&self) -> Option<SyncSettings> {
        self.saved.read().unwrap().last().cloned()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn save(&self, settings: &SyncSettings) -> Result<()> {
        self.saved.write().unwrap().push(settings.clone());
        Ok(())
    }
}
