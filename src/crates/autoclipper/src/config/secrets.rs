//! At-rest encryption for provider API keys.
//!
//! The original service uses Fernet (AES-128-CBC + HMAC, bundled nonce and
//! timestamp) from Python's `cryptography` package; this crate has no
//! equivalent dependency anywhere in its lineage, so key storage and the
//! encrypt/decrypt contract are reproduced with AES-256-GCM (`aes-gcm`) and
//! base64 framing instead. The key file format, generation-on-first-use
//! behavior, and the `ENCRYPTED_<NAME>`-keyed config entries are unchanged.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::{CoreError, Result};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Loads (or generates) the symmetric key at `key_path` and encrypts or
/// decrypts provider secrets with it.
pub struct SecretBox {
    cipher: Aes256Gcm,
}

impl SecretBox {
    /// Reads the key at `key_path`, generating and persisting a fresh one
    /// if the file is missing or unreadable as a valid key.
    pub fn load_or_create(key_path: &std::path::Path) -> Result<Self> {
        let key_bytes = match std::fs::read(key_path) {
            Ok(bytes) if bytes.len() == KEY_LEN => bytes,
            _ => {
                let fresh = Aes256Gcm::generate_key(OsRng).to_vec();
                if let Some(parent) = key_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(key_path, &fresh)?;
                fresh
            }
        };
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self { cipher: Aes256Gcm::new(key) })
    }

    /// Encrypts `plaintext`, returning a base64 string of `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CoreError::Internal(format!("secret encryption failed: {e}")))?;

        let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(framed))
    }

    /// Reverses [`Self::encrypt`]. Fails with [`CoreError::InvalidInput`] if
    /// the payload is malformed or was encrypted under a different key.
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let framed = BASE64
            .decode(encoded)
            .map_err(|e| CoreError::InvalidInput(format!("malformed encrypted secret: {e}")))?;
        if framed.len() < NONCE_LEN {
            return Err(CoreError::InvalidInput("encrypted secret too short".into()));
        }
        let (nonce_bytes, ciphertext) = framed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CoreError::InvalidInput("secret could not be decrypted".into()))?;
        String::from_utf8(plaintext).map_err(|e| CoreError::Internal(format!("decrypted secret was not utf-8: {e}")))
    }
}

/// Config key under which a provider's encrypted secret is stored.
pub fn config_key_for_provider(provider: &str) -> String {
    format!("ENCRYPTED_{}", provider.to_uppercase())
}
