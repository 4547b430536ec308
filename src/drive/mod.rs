//! Drive Module
//!
//! The authoritative store behind the server cache. Route handlers talk to
//! it through the [`DriveApi`] trait; the cache never does.
//!
//! # Implementations
//! - [`GoogleDrive`] - Google Drive v3 REST API over reqwest
//! - [`InMemoryDrive`] - in-process store for tests and local runs

mod errors;
mod google;
mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use errors::DriveError;
pub use google::GoogleDrive;
pub use memory::{DriveOp, InMemoryDrive};

// == Access Token ==
/// A bearer access credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

// == Records ==
/// A file in the target folder, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    /// Size in bytes, 0 when Drive does not report one
    pub size: u64,
    pub mime_type: String,
    pub created_time: Option<String>,
    pub web_view_link: Option<String>,
    pub download_link: String,
}

/// Identity record of the authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Result of a rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenamedFile {
    pub id: String,
    pub name: String,
}

/// Result of an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    /// Public download URL
    pub url: String,
}

/// A file to upload.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Public download URL for a Drive file id.
pub fn download_link(file_id: &str) -> String {
    format!("https://drive.google.com/uc?id={}&export=download", file_id)
}

/// True if `id` looks like a Drive file id and is safe in a URL path.
pub fn is_valid_file_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Media type used when an upload does not carry a usable one
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Returns `raw` if it is a well-formed `type/subtype[; params]` that is
/// safe inside a header, otherwise [`DEFAULT_MIME_TYPE`].
pub fn media_type_or_default(raw: &str) -> String {
    let raw = raw.trim();
    if reqwest::header::HeaderValue::from_str(raw).is_err() {
        return DEFAULT_MIME_TYPE.to_string();
    }

    let essence = raw.split(';').next().unwrap_or_default().trim();
    let is_token = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&^_.+-".contains(c))
    };
    match essence.split_once('/') {
        Some((kind, subtype)) if is_token(kind) && is_token(subtype) => raw.to_string(),
        _ => DEFAULT_MIME_TYPE.to_string(),
    }
}

// == Drive API ==
/// Operations the server performs against the remote store.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Identity of the credential's owner.
    async fn user_info(&self, token: &AccessToken) -> Result<UserInfo, DriveError>;

    /// Non-trashed files directly inside `folder_id`, newest first.
    async fn list_files(
        &self,
        token: &AccessToken,
        folder_id: &str,
    ) -> Result<Vec<DriveFile>, DriveError>;

    async fn delete_file(&self, token: &AccessToken, file_id: &str) -> Result<(), DriveError>;

    async fn rename_file(
        &self,
        token: &AccessToken,
        file_id: &str,
        name: &str,
    ) -> Result<RenamedFile, DriveError>;

    /// Uploads `file` into `folder_id` and makes it readable by anyone.
    async fn upload_file(
        &self,
        token: &AccessToken,
        folder_id: &str,
        file: NewFile,
    ) -> Result<UploadedFile, DriveError>;
}
