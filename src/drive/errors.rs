//! Drive API Error Types
//!
//! Maps HTTP status codes from the remote API to specific variants.

/// Drive API error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriveError {
    #[error("Credential rejected")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Request error: {0}")]
    Request(String),

    /// The file was created but a follow-up step failed
    #[error("File {file_id} was created but not published: {reason}")]
    Unpublished { file_id: String, reason: String },
}

impl DriveError {
    /// Create a DriveError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => DriveError::Unauthorized,
            403 => DriveError::Forbidden(body.to_string()),
            404 => DriveError::NotFound(body.to_string()),
            429 => DriveError::RateLimited,
            500..=599 => DriveError::Server(status, body.to_string()),
            _ => DriveError::Request(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl DriveError {
    /// True when the remote folder changed even though the call failed.
    pub fn changed_remote(&self) -> bool {
        matches!(self, DriveError::Unpublished { .. })
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DriveError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            DriveError::from_status(status.as_u16(), &err.to_string())
        } else {
            DriveError::Network(err.to_string())
        }
    }
}
