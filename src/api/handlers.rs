//! API Handlers
//!
//! HTTP request handlers for each server endpoint. Reads go through the
//! server cache; mutations call Drive first and invalidate only after Drive
//! reported success.

use axum::{
    extract::{Multipart, Path, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use super::invalidation::Mutation;
use super::session::Session;
use super::state::AppState;
use crate::drive::{is_valid_file_id, media_type_or_default, NewFile, DEFAULT_MIME_TYPE};
use crate::error::{AppError, Result};
use crate::models::{
    AuthStatusResponse, CacheStatsResponse, FilesResponse, HealthResponse, LogoutResponse,
    MessageResponse, RenameRequest, RenameResponse, UploadResponse,
};

/// Response header reporting whether the listing came from the server cache
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

/// Multipart field carrying the uploaded file
const UPLOAD_FIELD: &str = "file";

fn validate_file_id(file_id: &str) -> Result<()> {
    if is_valid_file_id(file_id) {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!("Invalid file id '{}'", file_id)))
    }
}

/// Handler for GET /api/auth/status
///
/// Anonymous callers and failed identity lookups both answer
/// `isAuthenticated: false`; a failed lookup is not cached.
pub async fn auth_status_handler(
    State(state): State<AppState>,
    session: Option<Session>,
) -> Json<AuthStatusResponse> {
    let Some(session) = session else {
        return Json(AuthStatusResponse::anonymous());
    };

    match state.user_info(&session).await {
        Ok((info, _)) => Json(AuthStatusResponse::authenticated(info)),
        Err(err) => {
            warn!(principal = %session.principal(), error = %err, "identity lookup failed");
            Json(AuthStatusResponse::anonymous())
        }
    }
}

/// Handler for POST /api/auth/login
///
/// Verifies the credential against Drive, stores the fresh identity and
/// drops any listing cached for the same principal.
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<AuthStatusResponse>> {
    let info = state.refresh_user_info(&session).await?;
    state.invalidate(Mutation::Login, session.principal()).await;

    info!(principal = %session.principal(), "login");
    Ok(Json(AuthStatusResponse::authenticated(info)))
}

/// Handler for POST /api/auth/logout
///
/// Drops the outgoing session's identity and listing entries before
/// answering.
pub async fn logout_handler(
    State(state): State<AppState>,
    session: Option<Session>,
) -> Json<LogoutResponse> {
    if let Some(session) = session {
        state.invalidate(Mutation::Logout, session.principal()).await;
    }
    Json(LogoutResponse { success: true })
}

/// Handler for GET /api/files
///
/// Sets `X-Cache-Status` from the lookup itself.
pub async fn list_files_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    let (files, status) = state.list_files(&session).await?;

    let mut response = Json(FilesResponse::new(files, status.is_hit())).into_response();
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status.as_str()));
    Ok(response)
}

/// Handler for DELETE /api/files/:file_id
pub async fn delete_handler(
    State(state): State<AppState>,
    session: Session,
    Path(file_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    validate_file_id(&file_id)?;

    state.drive.delete_file(session.token(), &file_id).await?;
    state.invalidate(Mutation::Delete, session.principal()).await;

    Ok(Json(MessageResponse::new("File deleted")))
}

/// Handler for PUT /api/files/:file_id
pub async fn rename_handler(
    State(state): State<AppState>,
    session: Session,
    Path(file_id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<RenameResponse>> {
    validate_file_id(&file_id)?;
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let renamed = state
        .drive
        .rename_file(session.token(), &file_id, req.trimmed_name())
        .await?;
    state.invalidate(Mutation::Rename, session.principal()).await;

    Ok(Json(RenameResponse::new(renamed)))
}

/// Handler for POST /upload
///
/// Expects a multipart body with a `file` field.
pub async fn upload_handler(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field
            .file_name()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidRequest("Uploaded file has no name".to_string()))?;
        let mime_type = field
            .content_type()
            .map(media_type_or_default)
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(e.body_text()))?;

        upload = Some(NewFile {
            name,
            mime_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let file = upload.ok_or_else(|| {
        AppError::InvalidRequest(format!("Missing multipart field '{}'", UPLOAD_FIELD))
    })?;

    let uploaded = match state
        .drive
        .upload_file(session.token(), state.folder_id(), file)
        .await
    {
        Ok(uploaded) => uploaded,
        Err(err) => {
            // The folder may already hold the new file.
            if err.changed_remote() {
                state.invalidate(Mutation::Upload, session.principal()).await;
            }
            return Err(err.into());
        }
    };
    state.invalidate(Mutation::Upload, session.principal()).await;

    info!(file_id = %uploaded.id, "upload complete");
    Ok(Json(UploadResponse {
        success: true,
        url: uploaded.url,
        id: uploaded.id,
        name: uploaded.name,
    }))
}

/// Handler for GET /api/cache/stats
///
/// Read-only: takes the read lock and purges nothing.
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let cache = state.cache.read().await;
    Json(CacheStatsResponse::new(cache.stats()))
}

/// Handler for POST /api/cache/clear
pub async fn cache_clear_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.write().await.clear();
    info!("server cache cleared on request");
    Json(MessageResponse::new("Cache cleared successfully"))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, TtlCache};
    use crate::config::Config;
    use crate::drive::{AccessToken, DriveError, DriveOp, InMemoryDrive, UserInfo};
    use std::sync::Arc;

    fn setup() -> (AppState, Arc<InMemoryDrive>) {
        let drive = Arc::new(InMemoryDrive::new().with_user(
            "tok-a",
            UserInfo {
                email: "alice@example.com".to_string(),
                name: "Alice".to_string(),
                picture: None,
            },
        ));
        let config = Config::default();
        let state = AppState::new(TtlCache::new(config.default_ttl()), drive.clone(), config);
        (state, drive)
    }

    fn session() -> Session {
        Session::new(AccessToken::new("tok-a"))
    }

    fn listing_key(state: &AppState) -> CacheKey {
        CacheKey::files_list(session().principal(), state.folder_id())
    }

    #[tokio::test]
    async fn test_auth_status_anonymous() {
        let (state, _) = setup();
        let response = auth_status_handler(State(state), None).await;
        assert!(!response.is_authenticated);
    }

    #[tokio::test]
    async fn test_auth_status_rejected_token_not_cached() {
        let (state, _) = setup();
        let bad = Session::new(AccessToken::new("unknown"));

        let response = auth_status_handler(State(state.clone()), Some(bad)).await;

        assert!(!response.is_authenticated);
        assert!(state.cache.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_invalidates_listing() {
        let (state, drive) = setup();
        let file = drive.seed_file(state.folder_id(), "a.txt", 1);
        state.list_files(&session()).await.unwrap();
        assert!(state.cache.read().await.contains(&listing_key(&state)));

        let result = delete_handler(State(state.clone()), session(), Path(file.id)).await;

        assert!(result.is_ok());
        assert!(!state.cache.read().await.contains(&listing_key(&state)));
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_listing() {
        let (state, drive) = setup();
        drive.seed_file(state.folder_id(), "a.txt", 1);
        state.list_files(&session()).await.unwrap();
        drive.fail_next(DriveOp::Delete, DriveError::Server(500, "boom".to_string()));

        let result = delete_handler(State(state.clone()), session(), Path("mem000001".to_string())).await;

        assert!(result.is_err());
        assert!(state.cache.read().await.contains(&listing_key(&state)));
    }

    #[tokio::test]
    async fn test_rename_rejects_blank_name() {
        let (state, drive) = setup();
        let file = drive.seed_file(state.folder_id(), "a.txt", 1);

        let result = rename_handler(
            State(state),
            session(),
            Path(file.id),
            Json(RenameRequest::new("  ")),
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert_eq!(drive.calls(DriveOp::Rename), 0);
    }

    #[tokio::test]
    async fn test_rename_invalid_file_id() {
        let (state, _) = setup();
        let result = rename_handler(
            State(state),
            session(),
            Path("../x".to_string()),
            Json(RenameRequest::new("b.txt")),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_login_replaces_identity_and_drops_listing() {
        let (state, drive) = setup();
        state.list_files(&session()).await.unwrap();

        let response = login_handler(State(state.clone()), session()).await.unwrap();

        assert!(response.is_authenticated);
        assert_eq!(drive.calls(DriveOp::UserInfo), 1);
        let cache = state.cache.read().await;
        assert!(cache.contains(&CacheKey::user_info(session().principal())));
        assert!(!cache.contains(&listing_key(&state)));
    }

    #[tokio::test]
    async fn test_cache_clear_handler() {
        let (state, _) = setup();
        state.list_files(&session()).await.unwrap();

        cache_clear_handler(State(state.clone())).await;

        assert_eq!(cache_stats_handler(State(state)).await.stats.size, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
