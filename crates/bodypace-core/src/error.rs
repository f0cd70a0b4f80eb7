use thiserror::Error;

pub type BodypaceResult<T> = Result<T, BodypaceError>;

#[derive(Debug, Error)]
pub enum BodypaceError {
    #[error("config error: {0}")]
    Config(String),

    #[error("secrets error: {0}")]
    Secrets(String),

    #[error("unsupported {what} schema version {found} (this build understands up to {supported})")]
    SchemaVersion {
        what: &'static str,
        found: u32,
        supported: u32,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
