use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use once_cell::sync::Lazy;
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CONFIG;

const TOKEN_VERSION: u8 = 0x01;
const NONCE_LEN: usize = 12;
// version byte + nonce + GCM tag; the minimum for an empty plaintext.
const MIN_TOKEN_LEN: usize = 1 + NONCE_LEN + 16;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("vault key unavailable: {0}")]
    KeyUnavailable(String),
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("invalid token format")]
    InvalidFormat,
}

/// AES-256-GCM with a nonce derived from the key and plaintext, so the same
/// credential always encrypts to the same token. That keeps nonce reuse
/// harmless (same nonce implies same plaintext) and lets imports de-duplicate
/// keys by comparing stored ciphertext.
pub struct SecretCipher {
    key: [u8; 32],
}

impl SecretCipher {
    pub fn from_key_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Key resolution order: explicit base64 key from config or env, then the
    /// key file, then a freshly generated key persisted to that file.
    pub fn from_config(vault_key: &str, key_file: &str) -> Result<Self, CipherError> {
        if !vault_key.is_empty() {
            return Self::from_base64(vault_key);
        }
        let path = Path::new(key_file);
        if path.exists() {
            let raw = fs::read_to_string(path)
                .map_err(|e| CipherError::KeyUnavailable(e.to_string()))?;
            return Self::from_base64(raw.trim());
        }
        let key: [u8; 32] = rand::rng().random();
        fs::write(path, B64.encode(key))
            .map_err(|e| CipherError::KeyUnavailable(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms)
                .map_err(|e| CipherError::KeyUnavailable(e.to_string()))?;
        }
        Ok(Self::from_key_bytes(key))
    }

    fn from_base64(encoded: &str) -> Result<Self, CipherError> {
        let bytes = B64
            .decode(encoded)
            .map_err(|_| CipherError::KeyUnavailable("key is not valid base64".to_string()))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CipherError::KeyUnavailable("key must be 32 bytes".to_string()))?;
        Ok(Self::from_key_bytes(key))
    }

    fn nonce_for(&self, plaintext: &[u8]) -> [u8; NONCE_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(plaintext);
        let digest = hasher.finalize();
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&digest[..NONCE_LEN]);
        nonce
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce_bytes = self.nonce_for(plaintext.as_bytes());
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &[],
                },
            )
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut token = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&ciphertext);
        Ok(B64.encode(token))
    }

    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        let raw = B64.decode(token).map_err(|_| CipherError::InvalidFormat)?;
        if raw.len() < MIN_TOKEN_LEN || raw[0] != TOKEN_VERSION {
            return Err(CipherError::InvalidFormat);
        }
        let nonce = Nonce::from_slice(&raw[1..1 + NONCE_LEN]);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &raw[1 + NONCE_LEN..],
                    aad: &[],
                },
            )
            .map_err(|_| CipherError::DecryptionFailed)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed)
    }
}

pub static CIPHER: Lazy<SecretCipher> = Lazy::new(|| {
    SecretCipher::from_config(&CONFIG.vault_key, &CONFIG.vault_key_file)
        .expect("failed to initialize vault cipher")
});

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> SecretCipher {
        SecretCipher::from_key_bytes([7u8; 32])
    }

    #[test]
    fn roundtrip_restores_plaintext() {
        let cipher = test_cipher();
        let token = cipher.encrypt("sk-test-1234567890").unwrap();
        assert_eq!(cipher.decrypt(&token).unwrap(), "sk-test-1234567890");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let cipher = test_cipher();
        let token = cipher.encrypt("").unwrap();
        assert_eq!(cipher.decrypt(&token).unwrap(), "");
    }

    #[test]
    fn same_plaintext_same_token() {
        let cipher = test_cipher();
        let a = cipher.encrypt("sk-deterministic").unwrap();
        let b = cipher.encrypt("sk-deterministic").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_plaintexts_differ() {
        let cipher = test_cipher();
        let a = cipher.encrypt("sk-one").unwrap();
        let b = cipher.encrypt("sk-two").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn foreign_key_cannot_decrypt() {
        let token = test_cipher().encrypt("sk-secret").unwrap();
        let other = SecretCipher::from_key_bytes([9u8; 32]);
        assert!(matches!(
            other.decrypt(&token),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn tampered_token_rejected() {
        let cipher = test_cipher();
        let token = cipher.encrypt("sk-secret").unwrap();
        let mut raw = B64.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        let tampered = B64.encode(raw);
        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(CipherError::DecryptionFailed)
        ));
    }

    #[test]
    fn garbage_tokens_are_invalid_format() {
        let cipher = test_cipher();
        assert!(matches!(
            cipher.decrypt("not base64!!!"),
            Err(CipherError::InvalidFormat)
        ));
        assert!(matches!(
            cipher.decrypt(&B64.encode(b"short")),
            Err(CipherError::InvalidFormat)
        ));
    }

    #[test]
    fn generated_key_file_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let key_file = dir.path().join("vault.key");
        let key_file = key_file.to_str().unwrap();

        let first = SecretCipher::from_config("", key_file).unwrap();
        let token = first.encrypt("sk-persisted").unwrap();

        let second = SecretCipher::from_config("", key_file).unwrap();
        assert_eq!(second.decrypt(&token).unwrap(), "sk-persisted");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(key_file).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
