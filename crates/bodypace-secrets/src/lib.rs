//! bodypace-secrets: the local secret record
//!
//! One JSON file holds everything the client must remember between runs:
//! the personal key, the bearer token, and the last credentials used to log
//! in. The file is rewritten whole on every update.

pub mod record;
pub mod store;

pub use record::{SecretRecord, SecretUpdate, RECORD_VERSION};
pub use store::{FileSecretStore, SecretStore};
