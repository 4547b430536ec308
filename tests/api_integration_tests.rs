//! Integration Tests for API Endpoints
//!
//! Drives the full router with an in-memory Drive and checks the server
//! cache from the outside: `X-Cache-Status`, the `cached` flag and the
//! number of calls that reached Drive.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use windfile::drive::{DriveError, DriveOp, InMemoryDrive, UserInfo};
use windfile::{create_router, AppState, Config};

const FOLDER: &str = "folderX";
const ALICE: &str = "tok-alice";
const BOB: &str = "tok-bob";

// == Helper Functions ==

fn user(email: &str) -> UserInfo {
    UserInfo {
        email: email.to_string(),
        name: email.split('@').next().unwrap_or_default().to_string(),
        picture: None,
    }
}

fn create_test_app() -> (Router, Arc<InMemoryDrive>) {
    let drive = Arc::new(
        InMemoryDrive::new()
            .with_user(ALICE, user("alice@example.com"))
            .with_user(BOB, user("bob@example.com")),
    );
    drive.seed_file(FOLDER, "report.pdf", 2048);
    drive.seed_file(FOLDER, "notes.txt", 12);

    let config = Config {
        folder_id: FOLDER.to_string(),
        ..Config::default()
    };
    let state = AppState::from_config(config, drive.clone());
    (create_router(state), drive)
}

fn request(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header("authorization", format!("Bearer {}", token)),
        None => builder,
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let cache_status = response
        .headers()
        .get("x-cache-status")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, cache_status, json)
}

async fn list(app: &Router, token: &str) -> (StatusCode, Option<String>, Value) {
    send(app, request("GET", "/api/files", Some(token)).body(Body::empty()).unwrap()).await
}

// == Listing ==

#[tokio::test]
async fn test_listing_miss_then_hit() {
    let (app, drive) = create_test_app();

    let (status, cache, json) = list(&app, ALICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(json["cached"], false);
    assert_eq!(json["files"].as_array().unwrap().len(), 2);
    // Newest first
    assert_eq!(json["files"][0]["name"], "notes.txt");

    let (_, cache, json) = list(&app, ALICE).await;
    assert_eq!(cache.as_deref(), Some("HIT"));
    assert_eq!(json["cached"], true);
    assert_eq!(drive.calls(DriveOp::List), 1);
}

#[tokio::test]
async fn test_listing_requires_credential() {
    let (app, drive) = create_test_app();

    let (status, _, json) =
        send(&app, request("GET", "/api/files", None).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(drive.calls(DriveOp::List), 0);
}

#[tokio::test]
async fn test_listing_isolated_per_principal() {
    let (app, drive) = create_test_app();

    list(&app, ALICE).await;
    let (_, cache, _) = list(&app, BOB).await;
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(drive.calls(DriveOp::List), 2);
}

#[tokio::test]
async fn test_failed_listing_not_cached() {
    let (app, drive) = create_test_app();
    drive.fail_next(DriveOp::List, DriveError::Server(503, "backend".to_string()));

    let (status, cache, json) = list(&app, ALICE).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(cache.is_none());
    assert_eq!(json["success"], false);

    let (status, cache, _) = list(&app, ALICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));
}

// == Mutations ==

#[tokio::test]
async fn test_delete_invalidates_listing() {
    let (app, drive) = create_test_app();
    let (_, _, json) = list(&app, ALICE).await;
    let id = json["files"][0]["id"].as_str().unwrap().to_string();

    let (status, _, json) = send(
        &app,
        request("DELETE", &format!("/api/files/{}", id), Some(ALICE))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (_, cache, json) = list(&app, ALICE).await;
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(json["files"].as_array().unwrap().len(), 1);
    assert_eq!(drive.calls(DriveOp::List), 2);
}

#[tokio::test]
async fn test_failed_delete_keeps_listing() {
    let (app, drive) = create_test_app();
    let (_, _, json) = list(&app, ALICE).await;
    let id = json["files"][0]["id"].as_str().unwrap().to_string();
    drive.fail_next(DriveOp::Delete, DriveError::Forbidden("read-only".to_string()));

    let (status, _, _) = send(
        &app,
        request("DELETE", &format!("/api/files/{}", id), Some(ALICE))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, cache, _) = list(&app, ALICE).await;
    assert_eq!(cache.as_deref(), Some("HIT"));
}

#[tokio::test]
async fn test_rename_invalidates_listing() {
    let (app, _) = create_test_app();
    let (_, _, json) = list(&app, ALICE).await;
    let id = json["files"][1]["id"].as_str().unwrap().to_string();

    let (status, _, json) = send(
        &app,
        request("PUT", &format!("/api/files/{}", id), Some(ALICE))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"  final.pdf "}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["file"]["name"], "final.pdf");

    let (_, cache, json) = list(&app, ALICE).await;
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(json["files"][1]["name"], "final.pdf");
}

#[tokio::test]
async fn test_rename_rejects_empty_name() {
    let (app, drive) = create_test_app();
    let (status, _, json) = send(
        &app,
        request("PUT", "/api/files/abc123", Some(ALICE))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"   "}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("empty"));
    assert_eq!(drive.calls(DriveOp::Rename), 0);
}

#[tokio::test]
async fn test_upload_invalidates_listing() {
    let (app, drive) = create_test_app();
    list(&app, ALICE).await;

    let body = "--XBOUNDARY\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"hello.txt\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        hello world\r\n\
        --XBOUNDARY--\r\n";
    let (status, _, json) = send(
        &app,
        request("POST", "/upload", Some(ALICE))
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "hello.txt");
    assert!(json["url"].as_str().unwrap().contains("export=download"));

    let (_, cache, json) = list(&app, ALICE).await;
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(json["files"][0]["name"], "hello.txt");
    assert_eq!(drive.files_in(FOLDER).len(), 3);
}

#[tokio::test]
async fn test_upload_created_but_unpublished_still_invalidates() {
    let (app, drive) = create_test_app();
    list(&app, ALICE).await;
    drive.fail_next(DriveOp::Permission, DriveError::Server(500, "acl".to_string()));

    let body = "--XBOUNDARY\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"half.txt\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        partial\r\n\
        --XBOUNDARY--\r\n";
    let (status, _, json) = send(
        &app,
        request("POST", "/upload", Some(ALICE))
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("not published"));

    let (_, cache, json) = list(&app, ALICE).await;
    assert_eq!(cache.as_deref(), Some("MISS"));
    assert_eq!(json["files"][0]["name"], "half.txt");
}

// == Auth ==

#[tokio::test]
async fn test_auth_status_anonymous_and_cached() {
    let (app, drive) = create_test_app();

    let (_, _, json) =
        send(&app, request("GET", "/api/auth/status", None).body(Body::empty()).unwrap()).await;
    assert_eq!(json["isAuthenticated"], false);

    for _ in 0..2 {
        let (_, _, json) = send(
            &app,
            request("GET", "/api/auth/status", Some(ALICE)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(json["isAuthenticated"], true);
        assert_eq!(json["user"]["email"], "alice@example.com");
    }
    assert_eq!(drive.calls(DriveOp::UserInfo), 1);
}

#[tokio::test]
async fn test_login_always_fetches_identity() {
    let (app, drive) = create_test_app();
    send(&app, request("GET", "/api/auth/status", Some(ALICE)).body(Body::empty()).unwrap()).await;

    let (status, _, json) =
        send(&app, request("POST", "/api/auth/login", Some(ALICE)).body(Body::empty()).unwrap())
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isAuthenticated"], true);
    assert_eq!(drive.calls(DriveOp::UserInfo), 2);
}

#[tokio::test]
async fn test_logout_clears_identity_and_listing() {
    let (app, drive) = create_test_app();
    send(&app, request("GET", "/api/auth/status", Some(ALICE)).body(Body::empty()).unwrap()).await;
    list(&app, ALICE).await;

    let (status, _, json) =
        send(&app, request("POST", "/api/auth/logout", Some(ALICE)).body(Body::empty()).unwrap())
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    send(&app, request("GET", "/api/auth/status", Some(ALICE)).body(Body::empty()).unwrap()).await;
    let (_, cache, _) = list(&app, ALICE).await;
    assert_eq!(drive.calls(DriveOp::UserInfo), 2);
    assert_eq!(cache.as_deref(), Some("MISS"));
}

#[tokio::test]
async fn test_logout_leaves_other_principals_cached() {
    let (app, _) = create_test_app();
    list(&app, ALICE).await;
    list(&app, BOB).await;

    send(&app, request("POST", "/api/auth/logout", Some(ALICE)).body(Body::empty()).unwrap()).await;

    let (_, cache, _) = list(&app, BOB).await;
    assert_eq!(cache.as_deref(), Some("HIT"));
}

// == Cache Debugging ==

#[tokio::test]
async fn test_cache_stats_and_clear() {
    let (app, _) = create_test_app();
    list(&app, ALICE).await;
    list(&app, ALICE).await;

    let (_, _, json) =
        send(&app, request("GET", "/api/cache/stats", None).body(Body::empty()).unwrap()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["stats"]["size"], 1);
    assert_eq!(json["stats"]["counters"]["hits"], 1);
    assert_eq!(json["stats"]["counters"]["misses"], 1);
    assert!(json["stats"]["items"][0]["key"]
        .as_str()
        .unwrap()
        .ends_with("{folderX}"));

    let (status, _, _) =
        send(&app, request("POST", "/api/cache/clear", None).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);

    let (_, cache, _) = list(&app, ALICE).await;
    assert_eq!(cache.as_deref(), Some("MISS"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app();
    let (status, _, json) =
        send(&app, request("GET", "/health", None).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}
