//! Password storage codecs.
//!
//! [`ReversibleCodec`] keeps the legacy contract: passwords are encrypted, not
//! hashed, and verified by decrypting the stored token and comparing. It
//! exists for behavioural parity with previously stored credentials; new
//! deployments should select [`Argon2Codec`](super::password::Argon2Codec)
//! through `PASSWORD_SCHEME=argon2`.

use std::sync::Arc;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use super::password::Argon2Codec;
use crate::config::{CredentialConfig, PasswordScheme};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Produces the stored form of a password and checks candidates against it.
pub trait CredentialCodec: Send + Sync {
    fn seal(&self, plaintext: &str) -> anyhow::Result<String>;

    /// Never errors: anything that cannot be checked does not match.
    fn verify(&self, plaintext: &str, stored: &str) -> bool;
}

pub fn from_config(config: &CredentialConfig) -> Arc<dyn CredentialCodec> {
    match config.scheme {
        PasswordScheme::Reversible => Arc::new(ReversibleCodec::new(&config.passphrase)),
        PasswordScheme::Argon2 => Arc::new(Argon2Codec),
    }
}

/// AES-256-GCM with a key derived from a fixed passphrase.
///
/// Token layout: `base64(nonce ‖ ciphertext)`, a fresh random nonce per call.
pub struct ReversibleCodec {
    cipher: Aes256Gcm,
}

impl ReversibleCodec {
    pub fn new(passphrase: &str) -> Self {
        let key = derive_key(passphrase);
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Empty input yields an empty token.
    pub fn encrypt(&self, plaintext: &str) -> anyhow::Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("encryption failed: {e}"))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    /// `None` when the token is malformed, corrupt or sealed under another key.
    /// An empty token decrypts to an empty string.
    pub fn decrypt(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return Some(String::new());
        }
        let blob = match STANDARD.decode(token) {
            Ok(b) => b,
            Err(e) => {
                debug!(error = %e, "credential token is not base64");
                return None;
            }
        };
        if blob.len() <= NONCE_LEN {
            debug!(len = blob.len(), "credential token too short");
            return None;
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let plain = match self.cipher.decrypt(Nonce::from_slice(nonce), ciphertext) {
            Ok(p) => p,
            Err(_) => {
                debug!("credential token failed authentication");
                return None;
            }
        };
        String::from_utf8(plain).ok()
    }
}

impl CredentialCodec for ReversibleCodec {
    fn seal(&self, plaintext: &str) -> anyhow::Result<String> {
        self.encrypt(plaintext)
    }

    fn verify(&self, plaintext: &str, stored: &str) -> bool {
        self.decrypt(stored).is_some_and(|p| p == plaintext)
    }
}

/// Space-padded or truncated to exactly 32 bytes.
fn derive_key(passphrase: &str) -> [u8; KEY_LEN] {
    let mut key = [b' '; KEY_LEN];
    let bytes = passphrase.as_bytes();
    let n = bytes.len().min(KEY_LEN);
    key[..n].copy_from_slice(&bytes[..n]);
    key
}
