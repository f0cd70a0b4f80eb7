use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Newest secret record layout this build reads and writes.
pub const RECORD_VERSION: u32 = 1;

/// Everything the client persists locally. Zeroized on drop.
///
/// Files written before the `version` field existed are read as version 1.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct SecretRecord {
    #[serde(default = "legacy_version")]
    pub version: u32,
    #[serde(default)]
    pub personal_key: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn legacy_version() -> u32 {
    1
}

impl Default for SecretRecord {
    fn default() -> Self {
        Self {
            version: RECORD_VERSION,
            personal_key: None,
            access_token: None,
            username: None,
            password: None,
        }
    }
}

impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn presence(v: &Option<String>) -> &'static str {
            if v.is_some() {
                "[REDACTED]"
            } else {
                "None"
            }
        }
        f.debug_struct("SecretRecord")
            .field("version", &self.version)
            .field("personal_key", &presence(&self.personal_key))
            .field("access_token", &presence(&self.access_token))
            .field("username", &self.username)
            .field("password", &presence(&self.password))
            .finish()
    }
}

/// A change to one logical field of the record.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretUpdate {
    PersonalKey(Option<String>),
    AccessToken(Option<String>),
    Credentials {
        username: Option<String>,
        password: Option<String>,
    },
}

impl SecretUpdate {
    pub(crate) fn apply(self, record: &mut SecretRecord) {
        match self {
            SecretUpdate::PersonalKey(key) => record.personal_key = key,
            SecretUpdate::AccessToken(token) => record.access_token = token,
            SecretUpdate::Credentials { username, password } => {
                record.username = username;
                record.password = password;
            }
        }
        record.version = RECORD_VERSION;
    }

    pub(crate) fn field_name(&self) -> &'static str {
        match self {
            SecretUpdate::PersonalKey(_) => "personalKey",
            SecretUpdate::AccessToken(_) => "accessToken",
            SecretUpdate::Credentials { .. } => "credentials",
        }
    }
}

impl std::fmt::Debug for SecretUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretUpdate({})", self.field_name())
    }
}
