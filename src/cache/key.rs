//! Cache Key Module
//!
//! Structured composite keys. Each key is a tuple of resource kind,
//! principal and optional scope, compared field by field, so two distinct
//! tuples can never map to the same entry.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Number of digest characters shown when a principal is displayed.
const DISPLAY_DIGEST_LEN: usize = 12;

// == Resource Kind ==
/// The class of resource an entry caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Client-side cached answer of the server's auth status endpoint
    AuthStatus,
    /// A folder listing
    FilesList,
    /// The identity record of a principal
    UserInfo,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::AuthStatus => "auth-status",
            ResourceKind::FilesList => "files-list",
            ResourceKind::UserInfo => "user-info",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Principal ==
/// The authenticated entity a key is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Principal {
    /// Hex SHA-256 digest of an access credential. The credential itself is
    /// never stored in a key.
    Credential(String),
    /// A normalized (trimmed, lowercased) email address.
    Email(String),
    /// No identity known yet.
    Anonymous,
}

impl Principal {
    /// Derives a principal from a session access credential.
    pub fn from_credential(token: &str) -> Self {
        let digest = Sha256::digest(token.as_bytes());
        Principal::Credential(hex::encode(digest))
    }

    /// Derives a principal from a user's email address.
    pub fn from_email(email: &str) -> Self {
        Principal::Email(email.trim().to_lowercase())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Credential(digest) => {
                let end = digest.len().min(DISPLAY_DIGEST_LEN);
                write!(f, "cred:{}", &digest[..end])
            }
            Principal::Email(email) => write!(f, "email:{}", email),
            Principal::Anonymous => f.write_str("anonymous"),
        }
    }
}

// == Cache Key ==
/// Composite cache key: `(kind, principal, scope)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub principal: Option<Principal>,
    pub scope: Option<String>,
}

impl CacheKey {
    /// Identity record of `principal`.
    pub fn user_info(principal: &Principal) -> Self {
        Self {
            kind: ResourceKind::UserInfo,
            principal: Some(principal.clone()),
            scope: None,
        }
    }

    /// Listing of `folder_id` as seen by `principal`.
    pub fn files_list(principal: &Principal, folder_id: &str) -> Self {
        Self {
            kind: ResourceKind::FilesList,
            principal: Some(principal.clone()),
            scope: Some(folder_id.to_string()),
        }
    }

    /// Listing of the server's configured folder as seen by `principal`.
    /// The client does not know the folder id, only who is logged in.
    pub fn user_files(principal: &Principal) -> Self {
        Self {
            kind: ResourceKind::FilesList,
            principal: Some(principal.clone()),
            scope: None,
        }
    }

    /// The auth status of the current tab. Unscoped: a client process holds
    /// at most one session.
    pub fn auth_status() -> Self {
        Self {
            kind: ResourceKind::AuthStatus,
            principal: None,
            scope: None,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(principal) = &self.principal {
            write!(f, "[{}]", principal)?;
        }
        if let Some(scope) = &self.scope {
            write!(f, "{{{}}}", scope)?;
        }
        Ok(())
    }
}
