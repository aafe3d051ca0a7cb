//! Secret Encryption
//!
//! Secrets are written through an [`EncryptionService`] which returns the
//! ciphertext together with the scheme tag that produced it. The tag is stored
//! next to the ciphertext so a later read can pick the matching strategy.

mod manager;

pub use manager::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scheme used to protect a stored secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionStrategy {
    /// Stored as-is; only for setups without a key
    #[serde(rename = "PLAIN")]
    Plain,
    /// AES-256-GCM with a local key file
    #[serde(rename = "AES256GCM")]
    Aes256Gcm,
}

impl EncryptionStrategy {
    /// Tag persisted next to the ciphertext
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionStrategy::Plain => "PLAIN",
            EncryptionStrategy::Aes256Gcm => "AES256GCM",
        }
    }
}

impl fmt::Display for EncryptionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PLAIN" => Ok(EncryptionStrategy::Plain),
            "AES256GCM" => Ok(EncryptionStrategy::Aes256Gcm),
            other => Err(Error::UnsupportedEncryption {
                tag: other.to_string(),
            }),
        }
    }
}

/// Ciphertext plus the scheme tag that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptResult {
    pub data: String,
    pub encryption: EncryptionStrategy,
}

/// Encrypts and decrypts secrets at the repository boundary
pub trait EncryptionService: Send + Sync {
    /// Encrypt with the active strategy
    fn encrypt(&self, plain: &str) -> Result<EncryptResult>;

    /// Decrypt with the strategy named by `encryption`.
    ///
    /// A missing tag means the value predates encryption and is returned unchanged.
    fn decrypt(&self, data: &str, encryption: Option<&str>) -> Result<String>;
}
