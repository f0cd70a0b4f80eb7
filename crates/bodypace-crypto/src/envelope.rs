//! Envelope codec: document wire fields <-> plaintext projection
//!
//! Wire form of a document:
//! ```text
//! name    = b64( seal(utf8(filename), document_key) )
//! content =      seal(bytes, document_key)
//! keys    = b64( seal(document_key, personal_key) )
//! ```
//!
//! Decoding must recover the document key before the name, because the
//! name is sealed under the document key, not the personal key.

use zeroize::Zeroize;

use crate::aead::{open, seal};
use crate::encoding::{from_base64, to_base64};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{DocumentKey, PersonalKey};
use crate::KEY_SIZE;

/// The three independently encrypted fields submitted for one document.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedDocument {
    /// Base64 ciphertext of the filename
    pub encrypted_name: String,
    /// Ciphertext of the document bytes
    pub encrypted_content: Vec<u8>,
    /// Base64 document key wrapped by the personal key
    pub wrapped_key: String,
}

impl std::fmt::Debug for SealedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedDocument")
            .field("encrypted_name", &self.encrypted_name)
            .field("encrypted_content_len", &self.encrypted_content.len())
            .field("wrapped_key", &self.wrapped_key)
            .finish()
    }
}

/// Encrypt a document under a fresh document key and wrap that key with the
/// personal key.
pub fn wrap(name: &str, content: &[u8], personal_key: &PersonalKey) -> CryptoResult<SealedDocument> {
    let document_key = DocumentKey::generate();

    let encrypted_name = encrypt_name(name, &document_key)?;
    let encrypted_content =
        seal(document_key.as_bytes(), content).map_err(|_| CryptoError::Encrypt)?;
    let wrapped_key = wrap_key(&document_key, personal_key)?;

    tracing::debug!(
        content_bytes = content.len(),
        sealed_bytes = encrypted_content.len(),
        "document sealed"
    );

    Ok(SealedDocument {
        encrypted_name,
        encrypted_content,
        wrapped_key,
    })
}

/// Recover the document key and the plaintext name of a document.
///
/// Content is left alone; callers that need it follow up with
/// [`unwrap_content`] using the returned key.
pub fn unwrap(
    encrypted_name: &str,
    wrapped_key: &str,
    personal_key: &PersonalKey,
) -> CryptoResult<(DocumentKey, String)> {
    let document_key = unwrap_key(wrapped_key, personal_key)?;
    let name = decrypt_name(encrypted_name, &document_key)?;
    Ok((document_key, name))
}

/// Decrypt document content with an already recovered document key.
pub fn unwrap_content(encrypted_content: &[u8], document_key: &DocumentKey) -> CryptoResult<Vec<u8>> {
    open(document_key.as_bytes(), encrypted_content).map_err(|_| CryptoError::ContentDecrypt)
}

/// Wrap a document key with the personal key, returning base64 text.
pub fn wrap_key(document_key: &DocumentKey, personal_key: &PersonalKey) -> CryptoResult<String> {
    let wrapped =
        seal(personal_key.as_bytes(), document_key.as_bytes()).map_err(|_| CryptoError::Encrypt)?;
    Ok(to_base64(&wrapped))
}

/// Unwrap a base64 wrapped document key with the personal key.
pub fn unwrap_key(wrapped_key: &str, personal_key: &PersonalKey) -> CryptoResult<DocumentKey> {
    let wrapped = from_base64(wrapped_key).map_err(|_| CryptoError::KeyUnwrap)?;
    let mut plaintext =
        open(personal_key.as_bytes(), &wrapped).map_err(|_| CryptoError::KeyUnwrap)?;

    if plaintext.len() != KEY_SIZE {
        plaintext.zeroize();
        return Err(CryptoError::KeyUnwrap);
    }

    let mut key_bytes = [0u8; KEY_SIZE];
    key_bytes.copy_from_slice(&plaintext);
    plaintext.zeroize();

    Ok(DocumentKey::from_bytes(key_bytes))
}

/// Encrypt a filename under a document key, returning base64 text.
pub fn encrypt_name(name: &str, document_key: &DocumentKey) -> CryptoResult<String> {
    let sealed = seal(document_key.as_bytes(), name.as_bytes()).map_err(|_| CryptoError::Encrypt)?;
    Ok(to_base64(&sealed))
}

/// Decrypt a base64 encrypted filename with a document key.
pub fn decrypt_name(encrypted_name: &str, document_key: &DocumentKey) -> CryptoResult<String> {
    let sealed = from_base64(encrypted_name).map_err(|_| CryptoError::NameDecrypt)?;
    let plaintext = open(document_key.as_bytes(), &sealed).map_err(|_| CryptoError::NameDecrypt)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::NameDecrypt)
}
