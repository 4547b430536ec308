//! Response DTOs for the server API
//!
//! Defines the structure of outgoing HTTP response bodies. The client
//! module deserializes the same types.

use serde::{Deserialize, Serialize};

use crate::cache::CacheSnapshot;
use crate::drive::{DriveFile, RenamedFile, UserInfo};

/// Public profile fields of the logged-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

impl From<UserInfo> for UserProfile {
    fn from(info: UserInfo) -> Self {
        Self {
            email: info.email,
            name: info.name,
            picture: info.picture,
        }
    }
}

/// Response body for GET /api/auth/status and POST /api/auth/login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub is_authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl AuthStatusResponse {
    pub fn authenticated(user: impl Into<UserProfile>) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            user: None,
        }
    }
}

/// Response body for GET /api/files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilesResponse {
    pub success: bool,
    pub files: Vec<DriveFile>,
    /// Whether the listing was served from the server cache
    pub cached: bool,
    /// Time the response was produced, RFC 3339
    pub timestamp: String,
}

impl FilesResponse {
    pub fn new(files: Vec<DriveFile>, cached: bool) -> Self {
        Self {
            success: true,
            files,
            cached,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for mutations that return only a message (delete, clear)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Response body for PUT /api/files/:id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameResponse {
    pub success: bool,
    pub message: String,
    pub file: RenamedFile,
}

impl RenameResponse {
    pub fn new(file: RenamedFile) -> Self {
        Self {
            success: true,
            message: format!("File renamed to '{}'", file.name),
            file,
        }
    }
}

/// Response body for POST /upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    /// Public download URL
    pub url: String,
    pub id: String,
    pub name: String,
}

/// Response body for POST /api/auth/logout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Response body for GET /api/cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub success: bool,
    pub stats: CacheSnapshot,
    pub timestamp: String,
}

impl CacheStatsResponse {
    pub fn new(stats: CacheSnapshot) -> Self {
        Self {
            success: true,
            stats,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub success: bool,
    /// Error message describing what went wrong
    pub error: String,
}
