use std::path::PathBuf;

use bodypace_crypto::CryptoError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no personal key found")]
    MissingKey,

    #[error("no access token found (run `bodypace login` first)")]
    MissingCredential,

    #[error("could not find document {0} in the list of documents on the server")]
    NotFound(i64),

    #[error("server did not respond with a filename")]
    MissingFilename,

    #[error("server responded with error: {status}")]
    Server { status: reqwest::StatusCode },

    #[error("server rejected the username or password")]
    InvalidCredentials,

    #[error("unexpected response from server: {0}")]
    UnexpectedResponse(String),

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("output destination already exists ({})", .0.display())]
    DestinationExists(PathBuf),

    #[error("{0}")]
    InvalidPath(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::UnexpectedResponse(e.to_string())
        } else {
            ClientError::Network(e)
        }
    }
}
