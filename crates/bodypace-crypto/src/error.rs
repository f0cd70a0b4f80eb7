use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Failures of the envelope codec.
///
/// Authentication failures do not say whether the key was wrong or the
/// ciphertext was modified; each variant only names the step that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("encryption failed")]
    Encrypt,

    #[error("document key unwrapping failed: wrong personal key or corrupted data")]
    KeyUnwrap,

    #[error("document name decryption failed: wrong key or corrupted data")]
    NameDecrypt,

    #[error("document content decryption failed: wrong key or corrupted data")]
    ContentDecrypt,
}
