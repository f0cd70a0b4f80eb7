//! Key material: the long-lived personal key and per-document keys

use rand::RngCore;
use zeroize::Zeroize;

use crate::encoding::{from_base64, to_base64};
use crate::error::{CryptoError, CryptoResult};
use crate::KEY_SIZE;

/// The user's long-lived 256-bit key. Only ever wraps document keys.
/// Zeroized on drop.
#[derive(Clone)]
pub struct PersonalKey {
    bytes: [u8; KEY_SIZE],
}

impl PersonalKey {
    /// Generate a random personal key.
    pub fn generate() -> Self {
        Self::from_bytes(random_key_bytes())
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Parse the base64 text form stored in the secret record.
    pub fn from_base64(text: &str) -> CryptoResult<Self> {
        decode_key(text)
            .map(Self::from_bytes)
            .map_err(|e| CryptoError::InvalidKey(format!("personal key: {e}")))
    }

    pub fn to_base64(&self) -> String {
        to_base64(&self.bytes)
    }
}

impl Drop for PersonalKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for PersonalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersonalKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A per-document 256-bit key encrypting one document's name and content.
/// Zeroized on drop.
#[derive(Clone)]
pub struct DocumentKey {
    bytes: [u8; KEY_SIZE],
}

impl DocumentKey {
    /// Generate a fresh random document key.
    pub fn generate() -> Self {
        Self::from_bytes(random_key_bytes())
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    pub fn from_base64(text: &str) -> CryptoResult<Self> {
        decode_key(text)
            .map(Self::from_bytes)
            .map_err(|e| CryptoError::InvalidKey(format!("document key: {e}")))
    }

    pub fn to_base64(&self) -> String {
        to_base64(&self.bytes)
    }
}

impl Drop for DocumentKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

fn random_key_bytes() -> [u8; KEY_SIZE] {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn decode_key(text: &str) -> Result<[u8; KEY_SIZE], String> {
    let mut decoded = from_base64(text).map_err(|e| format!("not valid base64: {e}"))?;
    if decoded.len() != KEY_SIZE {
        let len = decoded.len();
        decoded.zeroize();
        return Err(format!("wrong size: {len} bytes (expected {KEY_SIZE})"));
    }
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&decoded);
    decoded.zeroize();
    Ok(bytes)
}
