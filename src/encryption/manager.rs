//! Encryption Manager
//!
//! Default [`EncryptionService`] dispatching on [`EncryptionStrategy`].

use super::{EncryptResult, EncryptionService, EncryptionStrategy};
use crate::config::EncryptionSettings;
use crate::error::{Error, Result};
use crate::helpers::{self, EncryptionKey, load_or_create_key_file};
use std::path::Path;

/// Strategy dispatcher holding the optional AES key
pub struct EncryptionManager {
    strategy: EncryptionStrategy,
    key: Option<EncryptionKey>,
}

impl EncryptionManager {
    /// Manager that writes AES-256-GCM ciphertext with `key`
    pub fn with_key(key: EncryptionKey) -> Self {
        Self {
            strategy: EncryptionStrategy::Aes256Gcm,
            key: Some(key),
        }
    }

    /// Manager that stores secrets as-is and cannot read AES rows
    pub fn plain() -> Self {
        Self {
            strategy: EncryptionStrategy::Plain,
            key: None,
        }
    }

    /// Build from settings, loading (or creating) the key file when AES is active
    pub fn from_settings(settings: &EncryptionSettings, key_file: &Path) -> Result<Self> {
        match settings.strategy {
            EncryptionStrategy::Plain => {
                // keep reading rows that were written before switching to plain
                let key = if key_file.exists() {
                    Some(load_or_create_key_file(key_file)?)
                } else {
                    None
                };
                Ok(Self {
                    strategy: EncryptionStrategy::Plain,
                    key,
                })
            }
            EncryptionStrategy::Aes256Gcm => Ok(Self::with_key(load_or_create_key_file(key_file)?)),
        }
    }

    /// Strategy used for new ciphertext
    pub fn strategy(&self) -> EncryptionStrategy {
        self.strategy
    }

    fn key(&self) -> Result<&EncryptionKey> {
        self.key.as_ref().ok_or_else(|| Error::Encryption {
            message: "No encryption key is configured".to_string(),
        })
    }
}

impl EncryptionService for EncryptionManager {
    fn encrypt(&self, plain: &str) -> Result<EncryptResult> {
        let data = match self.strategy {
            EncryptionStrategy::Plain => plain.to_string(),
            EncryptionStrategy::Aes256Gcm => helpers::encrypt(self.key()?, plain)?,
        };

        Ok(EncryptResult {
            data,
            encryption: self.strategy,
        })
    }

    fn decrypt(&self, data: &str, encryption: Option<&str>) -> Result<String> {
        let Some(tag) = encryption else {
            return Ok(data.to_string());
        };

        match tag.parse::<EncryptionStrategy>()? {
            EncryptionStrategy::Plain => Ok(data.to_string()),
            EncryptionStrategy::Aes256Gcm => helpers::decrypt(self.key()?, data),
        }
    }
}
