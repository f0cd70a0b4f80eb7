//! bodypace-crypto: client-side envelope encryption for Bodypace documents
//!
//! Key hierarchy:
//! ```text
//! Personal Key (256-bit, generated once, held only by the user)
//!   └── Document Key (per-document, 256-bit random, wrapped by the personal key)
//!       ├── Name AEAD:    XChaCha20-Poly1305 (key=document_key, nonce=random_192bit)
//!       └── Content AEAD: XChaCha20-Poly1305 (key=document_key, nonce=random_192bit)
//! ```
//!
//! The server stores three independent ciphertexts per document: the
//! encrypted name, the encrypted content, and the wrapped document key.

pub mod aead;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod keys;

pub use envelope::{unwrap, unwrap_content, unwrap_key, wrap, SealedDocument};
pub use error::{CryptoError, CryptoResult};
pub use keys::{DocumentKey, PersonalKey};

/// Size of a symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
