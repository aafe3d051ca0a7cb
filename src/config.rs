//! Application Settings
//!
//! `settings.toml` in the config directory. Every key is optional; missing
//! sections fall back to their defaults.

use crate::constants::{DATABASE_FILE, ENCRYPTION_KEY_FILE, SETTINGS_FILE};
use crate::encryption::EncryptionStrategy;
use crate::error::Result;
use crate::helpers::{get_or_create_config_dir, get_or_create_data_dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Root settings document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub database: DatabaseSettings,
    pub encryption: EncryptionSettings,
    pub browser: BrowserSettings,
    pub log: LogSettings,
}

/// Local store location
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file; defaults to the data directory
    pub path: Option<PathBuf>,
}

/// Secret encryption
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncryptionSettings {
    /// Scheme used for newly written secrets
    pub strategy: EncryptionStrategy,
    /// Base64 AES key file; defaults to the config directory
    pub key_file: Option<PathBuf>,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            strategy: EncryptionStrategy::Aes256Gcm,
            key_file: None,
        }
    }
}

/// Key browser behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserSettings {
    /// `SAMPLES` argument for `MEMORY USAGE` (0 samples every nested value)
    pub memory_usage_samples: u32,
    /// Fail key info when `MEMORY USAGE` is denied by ACL instead of reporting no size
    pub abort_on_memory_usage_no_permission: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            memory_usage_samples: 0,
            abort_on_memory_usage_no_permission: true,
        }
    }
}

/// Logging output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Also write a daily rolling log file in the config directory
    pub file: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: false,
        }
    }
}

impl AppSettings {
    /// Parse settings from TOML text; empty text gives defaults
    pub fn from_toml(value: &str) -> Result<Self> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(value)?)
    }

    /// Load settings from a file, creating an empty one if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            fs::write(path, "")?;
        }
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Load settings from the platform config directory
    pub fn load() -> Result<Self> {
        let path = settings_path()?;

        #[cfg(debug_assertions)]
        info!("Settings file: {}", path.display());

        Self::load_from(&path)
    }

    /// Write settings back to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolved SQLite path
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_or_create_data_dir()?.join(DATABASE_FILE)),
        }
    }

    /// Resolved AES key file path
    pub fn key_file_path(&self) -> Result<PathBuf> {
        match &self.encryption.key_file {
            Some(path) => Ok(path.clone()),
            None => Ok(get_or_create_config_dir()?.join(ENCRYPTION_KEY_FILE)),
        }
    }
}

/// Location of `settings.toml`
pub fn settings_path() -> Result<PathBuf> {
    Ok(get_or_create_config_dir()?.join(SETTINGS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = AppSettings::from_toml("").unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.encryption.strategy, EncryptionStrategy::Aes256Gcm);
        assert!(settings.browser.abort_on_memory_usage_no_permission);
    }

    #[test]
    fn test_partial_settings() {
        let settings = AppSettings::from_toml(
            r#"
            [encryption]
            strategy = "PLAIN"

            [browser]
            memory_usage_samples = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.encryption.strategy, EncryptionStrategy::Plain);
        assert_eq!(settings.browser.memory_usage_samples, 5);
        assert!(settings.browser.abort_on_memory_usage_no_permission);
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    fn test_load_creates_file_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = AppSettings::load_from(&path).unwrap();
        assert!(path.exists());

        settings.log.file = true;
        settings.database.path = Some(dir.path().join("store.db"));
        settings.save_to(&path).unwrap();

        assert_eq!(AppSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_invalid_strategy_is_rejected() {
        let result = AppSettings::from_toml("[encryption]\nstrategy = \"ROT13\"\n");
        assert!(result.is_err());
    }
}
