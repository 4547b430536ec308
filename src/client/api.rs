//! Server API Transport
//!
//! The client's view of the server. [`FileManager`](super::FileManager)
//! talks to it through the [`ServerApi`] trait so tests can stand in for
//! the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::{ClientError, ClientResult};
use crate::api::CACHE_STATUS_HEADER;
use crate::cache::CacheStatus;
use crate::config::ClientConfig;
use crate::drive::{AccessToken, NewFile};
use crate::models::{
    AuthStatusResponse, ErrorResponse, FilesResponse, LogoutResponse, MessageResponse,
    RenameRequest, RenameResponse, UploadResponse,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A listing plus the server's report of where it came from.
#[derive(Debug, Clone)]
pub struct FilesPage {
    pub response: FilesResponse,
    /// Parsed `X-Cache-Status`, absent if the server did not send one
    pub backend_status: Option<CacheStatus>,
}

// == Server API ==
/// Calls the client makes against the server HTTP API.
#[async_trait]
pub trait ServerApi: Send + Sync {
    async fn auth_status(&self) -> ClientResult<AuthStatusResponse>;

    async fn login(&self) -> ClientResult<AuthStatusResponse>;

    async fn logout(&self) -> ClientResult<LogoutResponse>;

    async fn list_files(&self) -> ClientResult<FilesPage>;

    async fn rename_file(&self, file_id: &str, name: &str) -> ClientResult<RenameResponse>;

    async fn delete_file(&self, file_id: &str) -> ClientResult<MessageResponse>;

    async fn upload_file(&self, file: NewFile) -> ClientResult<UploadResponse>;
}

// == HTTP Implementation ==
/// [`ServerApi`] over HTTP, sending the credential as a bearer token.
#[derive(Debug, Clone)]
pub struct HttpServerApi {
    http: Client,
    base_url: String,
    token: Option<AccessToken>,
}

impl HttpServerApi {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Client for the server at `config.server_url`.
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(config.server_url.as_str())
    }

    /// Attaches the credential sent with every request.
    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.secret()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = self.authorize(request).send().await?;
        check(response).await
    }
}

/// Turns a non-2xx response into [`ClientError::Server`], preferring the
/// server's `{"error": ..}` message over the raw body.
async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|err| err.error)
        .unwrap_or(body);
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    Ok(response.json::<T>().await?)
}

fn ensure_success(success: bool, what: &str) -> ClientResult<()> {
    if success {
        Ok(())
    } else {
        Err(ClientError::Rejected(format!("{} reported failure", what)))
    }
}

#[async_trait]
impl ServerApi for HttpServerApi {
    async fn auth_status(&self) -> ClientResult<AuthStatusResponse> {
        let response = self.send(self.http.get(self.url("/api/auth/status"))).await?;
        decode(response).await
    }

    async fn login(&self) -> ClientResult<AuthStatusResponse> {
        let response = self.send(self.http.post(self.url("/api/auth/login"))).await?;
        decode(response).await
    }

    async fn logout(&self) -> ClientResult<LogoutResponse> {
        let response = self.send(self.http.post(self.url("/api/auth/logout"))).await?;
        let body: LogoutResponse = decode(response).await?;
        ensure_success(body.success, "logout")?;
        Ok(body)
    }

    async fn list_files(&self) -> ClientResult<FilesPage> {
        let response = self.send(self.http.get(self.url("/api/files"))).await?;
        let backend_status = response
            .headers()
            .get(CACHE_STATUS_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(CacheStatus::parse);
        let body: FilesResponse = decode(response).await?;
        ensure_success(body.success, "file listing")?;

        debug!(
            files = body.files.len(),
            backend = backend_status.map(|s| s.as_str()).unwrap_or("-"),
            "listing fetched from server"
        );
        Ok(FilesPage {
            response: body,
            backend_status,
        })
    }

    async fn rename_file(&self, file_id: &str, name: &str) -> ClientResult<RenameResponse> {
        let request = self
            .http
            .put(self.url(&format!("/api/files/{}", file_id)))
            .json(&RenameRequest::new(name));
        let body: RenameResponse = decode(self.send(request).await?).await?;
        ensure_success(body.success, "rename")?;
        Ok(body)
    }

    async fn delete_file(&self, file_id: &str) -> ClientResult<MessageResponse> {
        let request = self.http.delete(self.url(&format!("/api/files/{}", file_id)));
        let body: MessageResponse = decode(self.send(request).await?).await?;
        ensure_success(body.success, "delete")?;
        Ok(body)
    }

    async fn upload_file(&self, file: NewFile) -> ClientResult<UploadResponse> {
        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.name)
            .mime_str(&file.mime_type)?;
        let form = multipart::Form::new().part("file", part);

        let request = self.http.post(self.url("/upload")).multipart(form);
        let body: UploadResponse = decode(self.send(request).await?).await?;
        ensure_success(body.success, "upload")?;
        Ok(body)
    }
}
