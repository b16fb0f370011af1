// XChaCha20-Poly1305 sealing for the stored credential.
//
// Blob layout: 24-byte random nonce || ciphertext || 16-byte Poly1305 tag.
// Authentication failure is always an error, so a wrong key or a flipped
// bit can never decrypt to plausible-looking garbage.

use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Key, XChaCha20Poly1305, XNonce,
};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

/// Key size for XChaCha20-Poly1305 (256 bits)
pub const KEY_SIZE: usize = 32;

/// Nonce size for XChaCha20-Poly1305 (192 bits)
const NONCE_SIZE: usize = 24;

/// Poly1305 tag appended by the AEAD
const TAG_SIZE: usize = 16;

/// Symmetric key for the vault. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EncryptionKey").field(&"[redacted]").finish()
    }
}

impl EncryptionKey {
    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Rebuild a key from its persisted bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::VaultCorrupted(format!(
                "encryption key must be {KEY_SIZE} bytes, found {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
#[instrument(skip(key, plaintext), fields(plaintext_len = plaintext.len()))]
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = key
        .cipher()
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| Error::VaultCorrupted(format!("encryption failed: {e}")))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    debug!(blob_len = blob.len(), "Sealed secret");
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`]. Fails on a wrong key or any tampering.
#[instrument(skip(key, blob), fields(blob_len = blob.len()))]
pub fn decrypt(key: &EncryptionKey, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::VaultCorrupted(format!(
            "stored secret is truncated ({} bytes)",
            blob.len()
        )));
    }

    let (nonce, sealed) = blob.split_at(NONCE_SIZE);
    key.cipher()
        .decrypt(XNonce::from_slice(nonce), sealed)
        .map_err(|_| {
            warn!("Secret failed authentication - key mismatch or corrupted ciphertext");
            Error::VaultCorrupted(
                "stored secret does not authenticate under the current key".into(),
            )
        })
}
