use crate::error::CacheError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use zeroize::Zeroize;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Holds the 256-bit key used for encryption-at-rest in the Redis tier.
/// The memory tier is never encrypted (§4.2: "encryption at rest applies
/// only to data leaving the process").
pub struct CacheCipher {
    key: [u8; KEY_LEN],
}

impl Drop for CacheCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl CacheCipher {
    /// Derives a cipher from raw key bytes. The caller is expected to source
    /// these from `RESILIENCE_CACHE_ENCRYPTION_KEY` (base64) or an
    /// equivalent secret store; exactly `KEY_LEN` bytes are required.
    pub fn new(key_bytes: &[u8]) -> Result<Self, CacheError> {
        if key_bytes.len() != KEY_LEN {
            return Err(CacheError::Configuration(format!(
                "encryption key must be {KEY_LEN} bytes, got {}",
                key_bytes.len()
            )));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(key_bytes);
        Ok(Self { key })
    }

    /// Generates a fresh random key, for environments that do not pin one
    /// (development/testing — values never need to survive a restart).
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut key);
        Self { key }
    }

    /// Encrypts `plaintext`, returning `nonce || ciphertext` ready to store
    /// as an opaque blob.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CacheError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CacheError::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Reverses [`CacheCipher::encrypt`]. Fails closed: any tampering with
    /// the nonce or ciphertext surfaces as an error, never silent garbage.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, CacheError> {
        if blob.len() < NONCE_LEN {
            return Err(CacheError::Encryption("ciphertext shorter than nonce".to_string()));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let nonce = Nonce::from_slice(nonce_bytes);
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CacheError::Encryption(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plaintext() {
        let cipher = CacheCipher::generate();
        let plaintext = b"cached response body";
        let encrypted = cipher.encrypt(plaintext).unwrap();
        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn distinct_encryptions_of_the_same_plaintext_differ() {
        let cipher = CacheCipher::generate();
        let a = cipher.encrypt(b"same input").unwrap();
        let b = cipher.encrypt(b"same input").unwrap();
        assert_ne!(a, b, "nonce must be fresh per encryption");
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let cipher = CacheCipher::generate();
        let mut encrypted = cipher.encrypt(b"payload").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0xFF;
        assert!(cipher.decrypt(&encrypted).is_err());
    }

    #[test]
    fn rejects_wrong_length_keys() {
        assert!(CacheCipher::new(&[0u8; 10]).is_err());
    }
}
