//! API Routes
//!
//! Configures the Axum router with all server endpoints.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use super::handlers::{
    auth_status_handler, cache_clear_handler, cache_stats_handler, delete_handler,
    health_handler, list_files_handler, login_handler, logout_handler, rename_handler,
    upload_handler,
};
use super::state::AppState;

/// Cache-Control applied to static assets
const STATIC_CACHE_CONTROL: &str = "public, max-age=3600";

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /api/cache/stats` - Server cache snapshot
/// - `POST /api/cache/clear` - Clear the server cache
/// - `GET /api/auth/status` - Cached identity of the caller
/// - `POST /api/auth/login` - Verify the credential, warm identity
/// - `POST /api/auth/logout` - Drop the caller's cached entries
/// - `GET /api/files` - Cached folder listing
/// - `PUT /api/files/:file_id` - Rename a file
/// - `DELETE /api/files/:file_id` - Delete a file
/// - `POST /upload` - Multipart upload
///
/// Any other path is served from `STATIC_DIR` when configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/cache/stats", get(cache_stats_handler))
        .route("/api/cache/clear", post(cache_clear_handler))
        .route("/api/auth/status", get(auth_status_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/files", get(list_files_handler))
        .route(
            "/api/files/:file_id",
            put(rename_handler).delete(delete_handler),
        )
        .route("/upload", post(upload_handler).layer(upload_limit));

    if let Some(dir) = &state.config.static_dir {
        let assets: Router = Router::new()
            .fallback_service(ServeDir::new(dir))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::CACHE_CONTROL,
                HeaderValue::from_static(STATIC_CACHE_CONTROL),
            ));
        router = router.fallback_service(assets);
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::config::Config;
    use crate::drive::InMemoryDrive;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let config = Config::default();
        let state = AppState::new(
            TtlCache::new(config.default_ttl()),
            Arc::new(InMemoryDrive::open()),
            config,
        );
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cache_stats_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/cache/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_files_requires_credential() {
        let app = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/api/files").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_files_reports_cache_status() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/files")
                    .header("authorization", "Bearer tok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-cache-status"], "MISS");
    }

    #[tokio::test]
    async fn test_unknown_route_without_static_dir() {
        let app = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
