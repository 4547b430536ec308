//! File Manager
//!
//! Client-side consumer of the TTL cache. Reads of the auth status and the
//! file listing go through the client cache; mutations go straight to the
//! server and then drop and reload the listing.

use std::fmt::Write as _;

use tracing::{debug, info, warn};

use super::api::{HttpServerApi, ServerApi};
use super::error::{ClientError, ClientResult};
use super::indicator::CacheIndicator;
use crate::cache::{
    CacheKey, CacheSnapshot, CacheStatus, FillTicket, Principal, SharedCache, TtlCache,
};
use crate::config::ClientConfig;
use crate::drive::{AccessToken, DriveFile, NewFile};
use crate::models::{AuthStatusResponse, RenameRequest, RenameResponse, UploadResponse, UserProfile};
use crate::tasks::{spawn_cleanup_task_with, CleanupTask};

/// Values held by the client cache.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCacheValue {
    AuthStatus(AuthStatusResponse),
    Files(FilesSnapshot),
}

/// A listing as received from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct FilesSnapshot {
    pub files: Vec<DriveFile>,
    /// Server timestamp of the response
    pub fetched_at: String,
}

/// Where a listing handed to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesSource {
    ClientCache,
    Server,
}

/// Result of [`FileManager::load_files`].
#[derive(Debug, Clone)]
pub struct FilesView {
    pub files: Vec<DriveFile>,
    pub fetched_at: String,
    pub source: FilesSource,
    /// Server cache status, known only when the server was asked
    pub backend_status: Option<CacheStatus>,
}

impl FilesView {
    pub fn from_client_cache(&self) -> bool {
        self.source == FilesSource::ClientCache
    }
}

// == File Manager ==
pub struct FileManager<A> {
    api: A,
    cache: SharedCache<ClientCacheValue>,
    config: ClientConfig,
    indicator: CacheIndicator,
    current_user: Option<UserProfile>,
}

impl FileManager<HttpServerApi> {
    /// Manager talking HTTP to `config.server_url`, sending `token` if given.
    pub fn connect(config: ClientConfig, token: Option<AccessToken>) -> ClientResult<Self> {
        let mut api = HttpServerApi::from_config(&config)?;
        if let Some(token) = token {
            api = api.with_token(token);
        }
        Ok(Self::new(api, config))
    }
}

impl<A: ServerApi> FileManager<A> {
    pub fn new(api: A, config: ClientConfig) -> Self {
        let cache = TtlCache::new(config.default_ttl()).named("client");
        Self::with_cache(api, config, cache)
    }

    /// Uses a caller-built cache, e.g. one on a manual clock.
    pub fn with_cache(api: A, config: ClientConfig, cache: TtlCache<ClientCacheValue>) -> Self {
        Self {
            api,
            cache: cache.into_shared(),
            config,
            indicator: CacheIndicator::new(),
            current_user: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> SharedCache<ClientCacheValue> {
        self.cache.clone()
    }

    pub fn indicator(&self) -> &CacheIndicator {
        &self.indicator
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        self.current_user.as_ref()
    }

    /// Starts the periodic sweep. The indicator is refreshed after each run.
    pub fn start_sweep(&self) -> CleanupTask {
        let indicator = self.indicator.clone();
        spawn_cleanup_task_with(self.cache.clone(), self.config.sweep_interval(), move |snapshot| {
            indicator.update(snapshot)
        })
    }

    fn principal(&self) -> Principal {
        match &self.current_user {
            Some(user) => Principal::from_email(&user.email),
            None => Principal::Anonymous,
        }
    }

    fn files_key(&self) -> CacheKey {
        CacheKey::user_files(&self.principal())
    }

    // == Auth ==
    /// Returns the caller's auth status, from the client cache when fresh.
    ///
    /// Only an authenticated answer is cached, so a login made elsewhere is
    /// picked up on the next check.
    pub async fn check_auth_status(&mut self) -> ClientResult<AuthStatusResponse> {
        let key = CacheKey::auth_status();
        let (cached, ticket) = self.cache_lookup(&key).await;
        if let Some(ClientCacheValue::AuthStatus(status)) = cached {
            self.remember_user(status.user.clone()).await;
            return Ok(status);
        }

        let status = self.api.auth_status().await?;
        if status.is_authenticated {
            self.cache_fill(
                key,
                ClientCacheValue::AuthStatus(status.clone()),
                self.config.auth_status_ttl(),
                ticket,
            )
            .await;
        }
        self.remember_user(status.user.clone()).await;
        Ok(status)
    }

    /// Verifies the credential with the server and starts a fresh session.
    pub async fn login(&mut self) -> ClientResult<AuthStatusResponse> {
        let status = self.api.login().await?;
        if !status.is_authenticated {
            return Err(ClientError::Rejected("login was not accepted".to_string()));
        }

        self.remember_user(status.user.clone()).await;
        self.cache_delete(&self.files_key()).await;
        self.cache_set(
            CacheKey::auth_status(),
            ClientCacheValue::AuthStatus(status.clone()),
            self.config.auth_status_ttl(),
        )
        .await;
        Ok(status)
    }

    /// Ends the session. The whole client cache is dropped on success.
    pub async fn logout(&mut self) -> ClientResult<()> {
        self.api.logout().await?;
        self.cache_clear().await;
        self.current_user = None;
        info!("logged out, client cache cleared");
        Ok(())
    }

    /// Switches the current user, dropping entries of the previous one.
    async fn remember_user(&mut self, user: Option<UserProfile>) {
        let changed = match (&self.current_user, &user) {
            (Some(old), Some(new)) => old.email != new.email,
            (Some(_), None) => true,
            _ => false,
        };
        if changed {
            let previous = self.principal();
            let removed = self.cache.write().await.delete_principal(&previous);
            debug!(principal = %previous, removed, "previous user's entries dropped");
            self.publish().await;
        }
        self.current_user = user;
    }

    // == Listing ==
    /// Loads the listing for the current user.
    ///
    /// `force_refresh` skips the cache read; the fresh result is still
    /// written back. Failed loads leave the cache untouched.
    pub async fn load_files(&self, force_refresh: bool) -> ClientResult<FilesView> {
        let key = self.files_key();
        let (cached, ticket) = if force_refresh {
            (None, self.cache.read().await.ticket())
        } else {
            self.cache_lookup(&key).await
        };

        if let Some(ClientCacheValue::Files(snapshot)) = cached {
            return Ok(FilesView {
                files: snapshot.files,
                fetched_at: snapshot.fetched_at,
                source: FilesSource::ClientCache,
                backend_status: None,
            });
        }

        let page = self.api.list_files().await?;
        let snapshot = FilesSnapshot {
            files: page.response.files,
            fetched_at: page.response.timestamp,
        };
        self.cache_fill(
            key,
            ClientCacheValue::Files(snapshot.clone()),
            self.config.files_ttl(),
            ticket,
        )
        .await;

        Ok(FilesView {
            files: snapshot.files,
            fetched_at: snapshot.fetched_at,
            source: FilesSource::Server,
            backend_status: page.backend_status,
        })
    }

    // == Mutations ==
    pub async fn rename_file(&self, file_id: &str, name: &str) -> ClientResult<RenameResponse> {
        let request = RenameRequest::new(name);
        if let Some(message) = request.validate() {
            return Err(ClientError::InvalidRequest(message));
        }

        let response = self.api.rename_file(file_id, request.trimmed_name()).await?;
        self.after_mutation("rename").await;
        Ok(response)
    }

    pub async fn delete_file(&self, file_id: &str) -> ClientResult<()> {
        self.api.delete_file(file_id).await?;
        self.after_mutation("delete").await;
        Ok(())
    }

    pub async fn upload_file(&self, file: NewFile) -> ClientResult<UploadResponse> {
        if file.name.trim().is_empty() {
            return Err(ClientError::InvalidRequest("File name cannot be empty".to_string()));
        }

        let response = self.api.upload_file(file).await?;
        self.after_mutation("upload").await;
        Ok(response)
    }

    /// Drops the cached listing and reloads it from the server. A failed
    /// reload does not fail the mutation that already succeeded.
    async fn after_mutation(&self, op: &'static str) {
        self.cache_delete(&self.files_key()).await;
        if let Err(err) = self.load_files(true).await {
            warn!(op, error = %err, "listing refresh after mutation failed");
        }
    }

    // == Cache Access ==
    async fn cache_lookup(&self, key: &CacheKey) -> (Option<ClientCacheValue>, FillTicket) {
        let mut cache = self.cache.write().await;
        (cache.get(key), cache.ticket())
    }

    /// Writes a fetched value unless the key was invalidated meanwhile.
    async fn cache_fill(
        &self,
        key: CacheKey,
        value: ClientCacheValue,
        ttl: std::time::Duration,
        ticket: FillTicket,
    ) {
        let stored = self
            .cache
            .write()
            .await
            .set_if_fresh(key, value, Some(ttl), ticket);
        if stored {
            self.publish().await;
        }
    }

    async fn cache_set(&self, key: CacheKey, value: ClientCacheValue, ttl: std::time::Duration) {
        self.cache.write().await.set(key, value, Some(ttl));
        self.publish().await;
    }

    async fn cache_delete(&self, key: &CacheKey) {
        self.cache.write().await.delete(key);
        self.publish().await;
    }

    async fn cache_clear(&self) {
        self.cache.write().await.clear();
        self.publish().await;
    }

    async fn publish(&self) {
        let snapshot = self.cache.read().await.stats();
        self.indicator.update(&snapshot);
    }

    pub async fn cache_stats(&self) -> CacheSnapshot {
        self.cache.read().await.stats()
    }

    /// Human-readable dump of the client cache, also written to the log.
    pub async fn cache_report(&self) -> String {
        let snapshot = self.cache_stats().await;
        let report = format_report(&snapshot);
        info!(
            size = snapshot.size,
            pending_expiry = snapshot.pending_expiry,
            hit_rate = snapshot.hit_rate,
            "client cache report"
        );
        report
    }
}

fn format_report(snapshot: &CacheSnapshot) -> String {
    let mut out = format!(
        "client cache: {} items, {} awaiting expiry, hit rate {:.0}%\n",
        snapshot.size,
        snapshot.pending_expiry,
        snapshot.hit_rate * 100.0
    );
    for item in &snapshot.items {
        let _ = writeln!(
            out,
            "  {}: age {}s, expires in {}s",
            item.key, item.age_secs, item.expires_in_secs
        );
    }
    out
}
