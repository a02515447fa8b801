//! YAML settings file loader.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::{ConfigError, ProvisionSettings};

/// System-wide settings file consulted when no path is given.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/n8n-provision/config.yaml";

/// Loads [`ProvisionSettings`] from a YAML file on disk.
pub struct YamlSettingsStore {
    fallback: PathBuf,
}

impl YamlSettingsStore {
    #[must_use]
    pub fn new(fallback: impl Into<PathBuf>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    /// Load settings from `explicit` (the `--config` flag or
    /// `N8N_PROVISION_CONFIG`), falling back to the system-wide file and
    /// then to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path does not exist, or if the file
    /// cannot be read or parsed (unknown keys included), or if its values
    /// fail [`ProvisionSettings::validate`].
    pub fn load(&self, explicit: Option<&Path>) -> Result<ProvisionSettings> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::SettingsNotFound(path.to_path_buf()).into());
            }
            Some(path) => path,
            None if self.fallback.exists() => self.fallback.as_path(),
            None => {
                tracing::debug!(fallback = %self.fallback.display(), "no settings file, using defaults");
                return Ok(ProvisionSettings::default());
            }
        };

        tracing::debug!(path = %path.display(), "loading settings");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(ProvisionSettings::default());
        }
        let settings: ProvisionSettings = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(settings)
    }
}

impl Default for YamlSettingsStore {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_PATH)
    }
}
