use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtQueryError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Malformed URL state: {0}")]
    MalformedUrlState(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Error: {0}")]
    Error(String),
}

impl ArtQueryError {
    /// True for errors caused by the request itself rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ArtQueryError::InvalidQuery(_) | ArtQueryError::MalformedUrlState(_)
        )
    }
}
