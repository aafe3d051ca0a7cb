//! String manipulation and cryptography utilities.
//!
//! This module provides utility functions for:
//! - AES-256-GCM encryption and decryption for sensitive data (e.g., passwords)
//! - Base64 encoding/decoding for storage and transport
//! - Generating and reading AES key files

use crate::error::{Error, Result};
use aes_gcm::{
    Aes256Gcm,
    aead::{Aead, AeadCore, KeyInit, Nonce, OsRng, rand_core::RngCore},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::fs;
use std::path::Path;

/// Nonce length for AES-256-GCM
const NONCE_LEN: usize = 12;

/// Raw AES-256 key
pub type EncryptionKey = [u8; 32];

/// Encrypts a plaintext string using AES-256-GCM encryption.
///
/// The encrypted data is encoded as Base64 for easy storage and transport.
/// Each encryption uses a randomly generated nonce.
///
/// # Storage Format
/// The output Base64 string contains: `[nonce (12 bytes)][ciphertext (variable)]`
pub fn encrypt(key: &EncryptionKey, plain_text: &str) -> Result<String> {
    let cipher = Aes256Gcm::new(key.into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plain_text.as_bytes())
        .map_err(|e| Error::Encryption {
            message: format!("Encryption failed: {e}"),
        })?;

    let mut combined = nonce.to_vec();
    combined.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(combined))
}

/// Decrypts a Base64-encoded ciphertext produced by [`encrypt`].
pub fn decrypt(key: &EncryptionKey, cipher_text: &str) -> Result<String> {
    let data = BASE64.decode(cipher_text).map_err(|e| Error::Encryption {
        message: format!("Base64 decode failed: {e}"),
    })?;

    if data.len() < NONCE_LEN {
        return Err(Error::Encryption {
            message: "Ciphertext too short".to_string(),
        });
    }

    let cipher = Aes256Gcm::new(key.into());
    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
    let nonce = Nonce::<Aes256Gcm>::from_slice(nonce_bytes);

    let plaintext_bytes = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| Error::Encryption {
            message: format!("Decryption failed: {e}"),
        })?;

    String::from_utf8(plaintext_bytes).map_err(|e| Error::Encryption {
        message: format!("UTF-8 decode failed: {e}"),
    })
}

/// Generate a fresh random key
pub fn generate_key() -> EncryptionKey {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    key
}

/// Read a Base64 key file, creating it with a random key when absent
pub fn load_or_create_key_file(path: &Path) -> Result<EncryptionKey> {
    if path.exists() {
        let content = fs::read_to_string(path)?;
        let bytes = BASE64.decode(content.trim()).map_err(|e| Error::Encryption {
            message: format!("Invalid key file {}: {e}", path.display()),
        })?;
        return bytes.try_into().map_err(|bytes: Vec<u8>| Error::Encryption {
            message: format!("Key file must hold 32 bytes, found {}", bytes.len()),
        });
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let key = generate_key();
    fs::write(path, BASE64.encode(key))?;
    tracing::info!("Generated new encryption key at {}", path.display());

    Ok(key)
}
