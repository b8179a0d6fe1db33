//! Keyed cipher stages: AES-256-GCM, RC4, and repeating-key XOR.
//!
//! The session secret is either 32 bytes (bootstrap) or 64 bytes
//! (post-authentication); every cipher hashes it down to a uniform
//! 32-byte working key first.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::RngCore;
use rc4::consts::U32;
use rc4::{Rc4, StreamCipher};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Reduce a secret of any length to a 32-byte working key.
fn working_key(key: &[u8]) -> [u8; 32] {
    Sha256::digest(key).into()
}

/// Encrypt with AES-256-GCM. Output is `nonce || ciphertext || tag` so
/// the blob carries everything needed to reverse it.
pub(super) fn aes_encrypt(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&working_key(key))
        .map_err(|e| Error::transform(format!("AES key setup failed: {e}")))?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), data)
        .map_err(|_| Error::transform("AES encryption failed"))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt an AES-256-GCM blob produced by [`aes_encrypt`].
///
/// Fails when the key is wrong or the data was tampered with.
pub(super) fn aes_decrypt(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_LEN + TAG_LEN {
        return Err(Error::transform(format!(
            "AES payload too short: {} bytes",
            data.len()
        )));
    }
    let cipher = Aes256Gcm::new_from_slice(&working_key(key))
        .map_err(|e| Error::transform(format!("AES key setup failed: {e}")))?;

    let (nonce, ciphertext) = data.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::transform("AES decryption failed: wrong key or tampered data"))
}

/// Apply the RC4 keystream; encryption and decryption are the same
/// operation.
pub(super) fn rc4_apply(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let mut cipher = Rc4::<U32>::new_from_slice(&working_key(key))
        .map_err(|e| Error::transform(format!("RC4 key setup failed: {e}")))?;
    let mut out = data.to_vec();
    cipher.apply_keystream(&mut out);
    Ok(out)
}

/// Repeating-key XOR; its own inverse.
pub(super) fn xor_apply(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    if key.is_empty() {
        return Err(Error::transform("XOR requires a non-empty key"));
    }
    Ok(data
        .iter()
        .zip(key.iter().cycle())
        .map(|(d, k)| d ^ k)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes_roundtrip() {
        let data = b"tasking output";
        let blob = aes_encrypt(data, b"secret").unwrap();
        assert_eq!(blob.len(), NONCE_LEN + data.len() + TAG_LEN);
        assert_eq!(aes_decrypt(&blob, b"secret").unwrap(), data);
    }

    #[test]
    fn test_aes_nonces_differ() {
        let a = aes_encrypt(b"same input", b"key").unwrap();
        let b = aes_encrypt(b"same input", b"key").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_aes_wrong_key_fails() {
        let blob = aes_encrypt(b"data", b"right key").unwrap();
        let err = aes_decrypt(&blob, b"wrong key").unwrap_err();
        assert!(err.to_string().contains("wrong key"));
    }

    #[test]
    fn test_aes_tamper_fails() {
        let mut blob = aes_encrypt(b"data", b"key").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert!(aes_decrypt(&blob, b"key").is_err());
    }

    #[test]
    fn test_aes_short_input_fails() {
        assert!(aes_decrypt(&[0u8; 8], b"key").is_err());
    }

    #[test]
    fn test_aes_key_widths_are_uniform() {
        // 32-byte bootstrap and 64-byte session secrets both work
        let blob = aes_encrypt(b"data", &[0x42u8; 64]).unwrap();
        assert_eq!(aes_decrypt(&blob, &[0x42u8; 64]).unwrap(), b"data");
    }

    #[test]
    fn test_rc4_is_its_own_inverse() {
        let data = b"stream cipher payload";
        let once = rc4_apply(data, b"key").unwrap();
        assert_ne!(once, data);
        assert_eq!(rc4_apply(&once, b"key").unwrap(), data);
    }

    #[test]
    fn test_xor_is_its_own_inverse() {
        let data = vec![0x00, 0x41, 0xff, 0x10, 0x7f];
        let once = xor_apply(&data, b"k3y").unwrap();
        assert_eq!(xor_apply(&once, b"k3y").unwrap(), data);
    }

    #[test]
    fn test_xor_empty_key_fails() {
        assert!(xor_apply(b"data", b"").is_err());
    }
}
