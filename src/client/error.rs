//! Client error types

use thiserror::Error;

/// Errors surfaced by [`FileManager`](super::FileManager) operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server could not be reached or answered with an unreadable body
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Rejected before anything was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered 2xx with `success: false`
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    /// True when the server refused the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Server { status: 401, .. })
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
