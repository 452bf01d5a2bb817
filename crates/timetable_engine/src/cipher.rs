use aes::Aes128;
use ecb::cipher::block_padding::Pkcs7;
use ecb::cipher::{BlockEncryptMut, KeyInit};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("cipher key must be exactly {expected} bytes, got {actual}")]
    BadKeyLength { expected: usize, actual: usize },
}

/// Per-provider credential encryption primitive. Implementations must be
/// deterministic and honor the 16-byte key contract.
pub trait CredentialCipher: Send + Sync {
    fn encrypt(&self, secret: &str, key: &str) -> Result<String, CipherError>;
}

/// AES-128-ECB with PKCS7 padding, hex-encoded output. This is the scheme
/// the GDUT login endpoint expects for the password field.
#[derive(Debug, Default)]
pub struct AesEcbHexCipher;

impl CredentialCipher for AesEcbHexCipher {
    fn encrypt(&self, secret: &str, key: &str) -> Result<String, CipherError> {
        let key_bytes = key.as_bytes();
        let bad_key = || CipherError::BadKeyLength {
            expected: 16,
            actual: key_bytes.len(),
        };
        if key_bytes.len() != 16 {
            return Err(bad_key());
        }
        let encryptor = ecb::Encryptor::<Aes128>::new_from_slice(key_bytes).map_err(|_| bad_key())?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(secret.as_bytes());
        Ok(hex::encode(ciphertext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_is_deterministic() {
        let cipher = AesEcbHexCipher;
        let a = cipher.encrypt("secret", "abcdabcdabcdabcd").unwrap();
        let b = cipher.encrypt("secret", "abcdabcdabcdabcd").unwrap();
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        // PKCS7 pads to whole AES blocks; hex doubles the length.
        assert_eq!(a.len() % 32, 0);
    }

    #[test]
    fn different_keys_give_different_payloads() {
        let cipher = AesEcbHexCipher;
        let a = cipher.encrypt("secret", "abcdabcdabcdabcd").unwrap();
        let b = cipher.encrypt("secret", "zzzzzzzzzzzzzzzz").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn key_length_is_enforced_in_bytes() {
        let cipher = AesEcbHexCipher;
        let err = cipher.encrypt("secret", "short").unwrap_err();
        assert_eq!(
            err,
            CipherError::BadKeyLength {
                expected: 16,
                actual: 5
            }
        );
        // 16 characters but more than 16 bytes once encoded.
        let multibyte: String = "课".repeat(16);
        assert!(cipher.encrypt("secret", &multibyte).is_err());
    }
}
