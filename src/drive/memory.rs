//! In-Memory Drive
//!
//! A deterministic stand-in for Google Drive. Counts calls per operation
//! and can be told to fail the next call of a given kind, which lets tests
//! see exactly when the server cache falls through to the remote store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{
    download_link, AccessToken, DriveApi, DriveError, DriveFile, NewFile, RenamedFile,
    UploadedFile, UserInfo,
};

// == Drive Operation ==
/// Operation kinds, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveOp {
    UserInfo,
    List,
    Delete,
    Rename,
    Upload,
    /// Publishing an uploaded file, the second half of an upload
    Permission,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// token -> identity
    users: HashMap<String, UserInfo>,
    /// folder id -> files, newest first
    folders: HashMap<String, Vec<DriveFile>>,
    calls: HashMap<DriveOp, usize>,
    failures: HashMap<DriveOp, DriveError>,
    next_id: u64,
}

/// In-process Drive store.
#[derive(Debug, Default)]
pub struct InMemoryDrive {
    state: Mutex<MemoryState>,
    /// Accept any token, deriving a user from it
    open_access: bool,
}

impl InMemoryDrive {
    /// Creates an empty drive that only accepts registered tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty drive that accepts any non-empty token.
    pub fn open() -> Self {
        Self {
            open_access: true,
            ..Self::default()
        }
    }

    /// Registers `token` as belonging to `user`.
    pub fn with_user(self, token: &str, user: UserInfo) -> Self {
        self.lock().users.insert(token.to_string(), user);
        self
    }

    /// Adds a file to `folder_id` and returns it.
    pub fn seed_file(&self, folder_id: &str, name: &str, bytes: u64) -> DriveFile {
        let mut state = self.lock();
        let file = new_record(&mut state, name, "application/octet-stream", bytes);
        state
            .folders
            .entry(folder_id.to_string())
            .or_default()
            .insert(0, file.clone());
        file
    }

    /// Makes the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: DriveOp, error: DriveError) {
        self.lock().failures.insert(op, error);
    }

    /// Number of calls made for `op`, failed ones included.
    pub fn calls(&self, op: DriveOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Files currently in `folder_id`.
    pub fn files_in(&self, folder_id: &str) -> Vec<DriveFile> {
        self.lock().folders.get(folder_id).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the call, applies injected failures and resolves the caller.
    fn begin(&self, op: DriveOp, token: &AccessToken) -> Result<MutexGuard<'_, MemoryState>, DriveError> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;

        if let Some(error) = state.failures.remove(&op) {
            return Err(error);
        }

        let secret = token.secret();
        if secret.is_empty() {
            return Err(DriveError::Unauthorized);
        }
        if !state.users.contains_key(secret) {
            if !self.open_access {
                return Err(DriveError::Unauthorized);
            }
            let user = derived_user(secret);
            state.users.insert(secret.to_string(), user);
        }
        Ok(state)
    }
}

fn derived_user(token: &str) -> UserInfo {
    let digest = hex::encode(Sha256::digest(token.as_bytes()));
    let tag = &digest[..8];
    UserInfo {
        email: format!("user-{}@windfile.local", tag),
        name: format!("User {}", tag),
        picture: None,
    }
}

fn new_record(state: &mut MemoryState, name: &str, mime_type: &str, size: u64) -> DriveFile {
    state.next_id += 1;
    let id = format!("mem{:06}", state.next_id);
    DriveFile {
        download_link: download_link(&id),
        web_view_link: Some(format!("https://drive.google.com/file/d/{}/view", id)),
        created_time: Some(chrono::Utc::now().to_rfc3339()),
        id,
        name: name.to_string(),
        size,
        mime_type: mime_type.to_string(),
    }
}

fn find_file<'a>(state: &'a mut MemoryState, file_id: &str) -> Option<&'a mut DriveFile> {
    state
        .folders
        .values_mut()
        .flat_map(|files| files.iter_mut())
        .find(|f| f.id == file_id)
}

#[async_trait]
impl DriveApi for InMemoryDrive {
    async fn user_info(&self, token: &AccessToken) -> Result<UserInfo, DriveError> {
        let state = self.begin(DriveOp::UserInfo, token)?;
        state
            .users
            .get(token.secret())
            .cloned()
            .ok_or(DriveError::Unauthorized)
    }

    async fn list_files(
        &self,
        token: &AccessToken,
        folder_id: &str,
    ) -> Result<Vec<DriveFile>, DriveError> {
        let state = self.begin(DriveOp::List, token)?;
        Ok(state.folders.get(folder_id).cloned().unwrap_or_default())
    }

    async fn delete_file(&self, token: &AccessToken, file_id: &str) -> Result<(), DriveError> {
        let mut state = self.begin(DriveOp::Delete, token)?;
        for files in state.folders.values_mut() {
            if let Some(pos) = files.iter().position(|f| f.id == file_id) {
                files.remove(pos);
                return Ok(());
            }
        }
        Err(DriveError::NotFound(file_id.to_string()))
    }

    async fn rename_file(
        &self,
        token: &AccessToken,
        file_id: &str,
        name: &str,
    ) -> Result<RenamedFile, DriveError> {
        let mut state = self.begin(DriveOp::Rename, token)?;
        let file = find_file(&mut state, file_id)
            .ok_or_else(|| DriveError::NotFound(file_id.to_string()))?;
        file.name = name.to_string();
        Ok(RenamedFile {
            id: file.id.clone(),
            name: file.name.clone(),
        })
    }

    async fn upload_file(
        &self,
        token: &AccessToken,
        folder_id: &str,
        file: NewFile,
    ) -> Result<UploadedFile, DriveError> {
        let mut state = self.begin(DriveOp::Upload, token)?;
        let record = new_record(&mut state, &file.name, &file.mime_type, file.bytes.len() as u64);
        state
            .folders
            .entry(folder_id.to_string())
            .or_default()
            .insert(0, record.clone());

        *state.calls.entry(DriveOp::Permission).or_insert(0) += 1;
        if let Some(error) = state.failures.remove(&DriveOp::Permission) {
            return Err(DriveError::Unpublished {
                file_id: record.id,
                reason: error.to_string(),
            });
        }

        Ok(UploadedFile {
            url: record.download_link,
            id: record.id,
            name: record.name,
        })
    }
}
