//! Request DTOs for the server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::{Deserialize, Serialize};

/// Longest accepted file name, in characters
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Request body for the rename operation (PUT /api/files/:id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRequest {
    /// The new file name
    #[serde(default)]
    pub name: String,
}

impl RenameRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Some("File name cannot be empty".to_string());
        }
        if name.chars().count() > MAX_FILE_NAME_LENGTH {
            return Some(format!(
                "File name exceeds maximum length of {} characters",
                MAX_FILE_NAME_LENGTH
            ));
        }
        None
    }

    /// The name as it will be stored.
    pub fn trimmed_name(&self) -> &str {
        self.name.trim()
    }
}
