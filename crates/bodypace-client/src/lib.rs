//! bodypace-client: talks to the personal data server and applies the
//! envelope codec to what goes over the wire.
//!
//! The server only ever receives and returns ciphertext for names, content
//! and document keys. Whether a call returns the wire form or the plaintext
//! projection is chosen per call with the `decrypt`/`encrypt` flag.

pub mod client;
pub mod disposition;
pub mod error;
pub mod local;

pub use client::DocumentClient;
pub use error::{ClientError, ClientResult};
pub use local::{decrypt_file, encrypt_file, save_fetched, EncryptedArtifact};
