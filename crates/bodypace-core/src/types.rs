//! Wire schema (v1) for the personal data server.
//!
//! Unknown fields sent by the server are preserved in `Document::metadata`
//! so newer servers can add fields without breaking older clients.

use serde::{Deserialize, Serialize};

/// `keys` value submitted for documents uploaded without encryption.
pub const KEYS_PLACEHOLDER: &str = "nothing";

/// A document record as returned by `GET /documents`.
///
/// On the wire `name` is the base64 ciphertext of the filename and `keys` is
/// the base64 document key wrapped by the owner's personal key. After a
/// decrypting listing, `name` holds the plaintext filename and `keys` the
/// base64 document key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub keys: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Result of fetching a single document.
#[derive(Clone, PartialEq)]
pub struct FetchedDocument {
    pub filename: String,
    pub content: Vec<u8>,
    /// Base64 document key when `decrypted`, otherwise the wrapped key.
    pub keys: String,
    pub decrypted: bool,
}

impl std::fmt::Debug for FetchedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedDocument")
            .field("filename", &self.filename)
            .field("content_len", &self.content.len())
            .field("keys", &"[REDACTED]")
            .field("decrypted", &self.decrypted)
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /accounts/login` response. Servers have been seen to send the
/// token as a number, so it is kept as a raw JSON value.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<serde_json::Value>,
}

/// `GET /accounts` response: the subject the bearer token belongs to.
#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    pub sub: serde_json::Value,
}

/// Render a JSON scalar as plain text (strings without quotes).
pub fn value_to_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
