//! Application state
//!
//! The server cache, the Drive collaborator and the configuration, shared
//! by every handler. The cached read paths live here so every handler goes
//! through the same lookup, fallback and write-back sequence.

use std::sync::Arc;

use tracing::{debug, info};

use super::invalidation::Mutation;
use super::session::Session;
use crate::cache::{CacheKey, CacheStatus, FillTicket, Principal, SharedCache, TtlCache};
use crate::config::Config;
use crate::drive::{DriveApi, DriveError, DriveFile, UserInfo};

/// Values held by the server cache.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerCacheValue {
    UserInfo(UserInfo),
    Files(Vec<DriveFile>),
}

impl ServerCacheValue {
    fn into_user_info(self) -> Option<UserInfo> {
        match self {
            ServerCacheValue::UserInfo(info) => Some(info),
            ServerCacheValue::Files(_) => None,
        }
    }

    fn into_files(self) -> Option<Vec<DriveFile>> {
        match self {
            ServerCacheValue::Files(files) => Some(files),
            ServerCacheValue::UserInfo(_) => None,
        }
    }
}

/// Application state shared across all handlers.
///
/// Contains the cache store wrapped in Arc<RwLock<>> for thread-safe access.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache store
    pub cache: SharedCache<ServerCacheValue>,
    /// Authoritative store
    pub drive: Arc<dyn DriveApi>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates a new AppState from its parts.
    pub fn new(
        cache: TtlCache<ServerCacheValue>,
        drive: Arc<dyn DriveApi>,
        config: Config,
    ) -> Self {
        Self {
            cache: cache.into_shared(),
            drive,
            config: Arc::new(config),
        }
    }

    /// Creates a new AppState with an empty cache sized from configuration.
    pub fn from_config(config: Config, drive: Arc<dyn DriveApi>) -> Self {
        let cache = TtlCache::new(config.default_ttl()).named("server");
        Self::new(cache, drive, config)
    }

    pub fn folder_id(&self) -> &str {
        &self.config.folder_id
    }

    // == Identity ==
    /// Identity of the session's owner, from cache or Drive.
    ///
    /// Failures are returned as-is and leave the cache untouched.
    pub async fn user_info(&self, session: &Session) -> Result<(UserInfo, CacheStatus), DriveError> {
        let key = CacheKey::user_info(session.principal());
        let (cached, ticket) = self.lookup(&key).await;
        if let Some(info) = cached.and_then(ServerCacheValue::into_user_info) {
            return Ok((info, CacheStatus::Hit));
        }

        let info = self.drive.user_info(session.token()).await?;
        self.cache.write().await.set_if_fresh(
            key,
            ServerCacheValue::UserInfo(info.clone()),
            Some(self.config.user_info_ttl()),
            ticket,
        );
        Ok((info, CacheStatus::Miss))
    }

    /// Fetches identity from Drive unconditionally and stores it.
    pub async fn refresh_user_info(&self, session: &Session) -> Result<UserInfo, DriveError> {
        let ticket = self.cache.read().await.ticket();
        let info = self.drive.user_info(session.token()).await?;
        self.cache.write().await.set_if_fresh(
            CacheKey::user_info(session.principal()),
            ServerCacheValue::UserInfo(info.clone()),
            Some(self.config.user_info_ttl()),
            ticket,
        );
        Ok(info)
    }

    // == Listing ==
    /// Listing of the configured folder for the session, from cache or Drive.
    pub async fn list_files(
        &self,
        session: &Session,
    ) -> Result<(Vec<DriveFile>, CacheStatus), DriveError> {
        let key = CacheKey::files_list(session.principal(), self.folder_id());
        let (cached, ticket) = self.lookup(&key).await;
        if let Some(files) = cached.and_then(ServerCacheValue::into_files) {
            return Ok((files, CacheStatus::Hit));
        }

        debug!(folder = %self.folder_id(), "fetching listing from Drive");
        let files = self.drive.list_files(session.token(), self.folder_id()).await?;
        self.cache.write().await.set_if_fresh(
            key,
            ServerCacheValue::Files(files.clone()),
            Some(self.config.files_ttl()),
            ticket,
        );
        Ok((files, CacheStatus::Miss))
    }

    /// Cache read plus the ticket for filling a miss, under one lock.
    async fn lookup(&self, key: &CacheKey) -> (Option<ServerCacheValue>, FillTicket) {
        let mut cache = self.cache.write().await;
        (cache.get(key), cache.ticket())
    }

    // == Invalidation ==
    /// Deletes the keys `mutation` makes stale for `principal`.
    /// Returns how many entries were actually present.
    pub async fn invalidate(&self, mutation: Mutation, principal: &Principal) -> usize {
        let keys = mutation.keys(principal, self.folder_id());
        let mut cache = self.cache.write().await;
        let removed = keys.iter().filter(|key| cache.delete(key)).count();
        drop(cache);

        info!(
            mutation = mutation.as_str(),
            principal = %principal,
            removed,
            "server cache invalidated"
        );
        removed
    }
}
