//! Google Drive API Client
//!
//! Drive v3 REST calls made with the caller's own access token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{
    download_link, media_type_or_default, AccessToken, DriveApi, DriveError, DriveFile, NewFile,
    RenamedFile, UploadedFile, UserInfo,
};
use crate::cache::current_timestamp_ms;

const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Timeout for metadata calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for uploads, which may carry large bodies
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Fields requested for each listed file
const LIST_FIELDS: &str = "files(id,name,size,mimeType,createdTime,webViewLink,webContentLink)";

const PAGE_SIZE: u32 = 50;

/// Google Drive client
#[derive(Debug, Clone)]
pub struct GoogleDrive {
    http: Client,
    api_url: String,
    upload_url: String,
    userinfo_url: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    files: Vec<RawFile>,
}

/// A file as Drive reports it; `size` arrives as a decimal string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    id: String,
    name: String,
    size: Option<String>,
    #[serde(default)]
    mime_type: String,
    created_time: Option<String>,
    web_view_link: Option<String>,
}

impl From<RawFile> for DriveFile {
    fn from(raw: RawFile) -> Self {
        let size = raw
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        DriveFile {
            download_link: download_link(&raw.id),
            id: raw.id,
            name: raw.name,
            size,
            mime_type: raw.mime_type,
            created_time: raw.created_time,
            web_view_link: raw.web_view_link,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
    name: String,
}

impl GoogleDrive {
    /// Creates a client against the public Google endpoints.
    pub fn new() -> Result<Self, DriveError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DriveError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: DRIVE_API_URL.to_string(),
            upload_url: DRIVE_UPLOAD_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
        })
    }

    /// Points the client at another host serving the same API (proxies, fakes).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.api_url = format!("{}/drive/v3", base);
        self.upload_url = format!("{}/upload/drive/v3", base);
        self.userinfo_url = format!("{}/oauth2/v2/userinfo", base);
        self
    }

    /// Turns a non-success response into a `DriveError`.
    async fn check(response: Response) -> Result<Response, DriveError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DriveError::from_status(status.as_u16(), &body))
    }

    async fn make_public(&self, token: &AccessToken, file_id: &str) -> Result<(), DriveError> {
        let response = self
            .http
            .post(format!("{}/files/{}/permissions", self.api_url, file_id))
            .bearer_auth(token.secret())
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Query selecting the non-trashed children of `folder_id`.
fn folder_query(folder_id: &str) -> String {
    format!(
        "'{}' in parents and trashed=false",
        folder_id.replace('\\', "\\\\").replace('\'', "\\'")
    )
}

/// Builds a `multipart/related` body: JSON metadata part, then media part.
fn multipart_related(boundary: &str, metadata: &serde_json::Value, file: &NewFile) -> Vec<u8> {
    let mut body = Vec::with_capacity(file.bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
            b = boundary,
            m = metadata,
            t = media_type_or_default(&file.mime_type)
        )
        .as_bytes(),
    );
    body.extend_from_slice(&file.bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[async_trait]
impl DriveApi for GoogleDrive {
    async fn user_info(&self, token: &AccessToken) -> Result<UserInfo, DriveError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(token.secret())
            .send()
            .await?;
        let info = Self::check(response).await?.json::<UserInfo>().await?;
        Ok(info)
    }

    async fn list_files(
        &self,
        token: &AccessToken,
        folder_id: &str,
    ) -> Result<Vec<DriveFile>, DriveError> {
        let query = folder_query(folder_id);
        debug!(query = %query, "listing Drive folder");

        let page_size = PAGE_SIZE.to_string();
        let response = self
            .http
            .get(format!("{}/files", self.api_url))
            .bearer_auth(token.secret())
            .query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("orderBy", "createdTime desc"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;
        let listing = Self::check(response).await?.json::<ListResponse>().await?;

        debug!(count = listing.files.len(), "Drive listing received");
        Ok(listing.files.into_iter().map(DriveFile::from).collect())
    }

    async fn delete_file(&self, token: &AccessToken, file_id: &str) -> Result<(), DriveError> {
        let response = self
            .http
            .delete(format!("{}/files/{}", self.api_url, file_id))
            .bearer_auth(token.secret())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn rename_file(
        &self,
        token: &AccessToken,
        file_id: &str,
        name: &str,
    ) -> Result<RenamedFile, DriveError> {
        let response = self
            .http
            .patch(format!("{}/files/{}", self.api_url, file_id))
            .bearer_auth(token.secret())
            .query(&[("fields", "id,name")])
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let renamed = Self::check(response).await?.json::<RenamedFile>().await?;
        Ok(renamed)
    }

    async fn upload_file(
        &self,
        token: &AccessToken,
        folder_id: &str,
        file: NewFile,
    ) -> Result<UploadedFile, DriveError> {
        let boundary = format!("windfile-{}", current_timestamp_ms());
        let metadata = json!({ "name": file.name, "parents": [folder_id] });
        let body = multipart_related(&boundary, &metadata, &file);

        info!(name = %file.name, bytes = file.bytes.len(), "uploading to Drive");
        let response = self
            .http
            .post(format!("{}/files", self.upload_url))
            .bearer_auth(token.secret())
            .query(&[("uploadType", "multipart"), ("fields", "id,name,parents")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .timeout(UPLOAD_TIMEOUT)
            .body(body)
            .send()
            .await?;
        let created = Self::check(response).await?.json::<CreatedFile>().await?;

        if let Err(err) = self.make_public(token, &created.id).await {
            return Err(DriveError::Unpublished {
                file_id: created.id,
                reason: err.to_string(),
            });
        }

        Ok(UploadedFile {
            url: download_link(&created.id),
            id: created.id,
            name: created.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_query() {
        assert_eq!(folder_query("abc"), "'abc' in parents and trashed=false");
        assert_eq!(folder_query("a'b"), "'a\\'b' in parents and trashed=false");
    }

    #[test]
    fn test_raw_file_conversion() {
        let raw: RawFile = serde_json::from_str(
            r#"{"id":"f1","name":"report.pdf","size":"2048","mimeType":"application/pdf","createdTime":"2024-05-01T10:00:00.000Z"}"#,
        )
        .unwrap();
        let file = DriveFile::from(raw);
        assert_eq!(file.size, 2048);
        assert_eq!(file.download_link, download_link("f1"));
        assert!(file.web_view_link.is_none());
    }

    #[test]
    fn test_raw_file_without_size() {
        let raw: RawFile =
            serde_json::from_str(r#"{"id":"d1","name":"Doc","mimeType":"application/vnd.google-apps.document"}"#)
                .unwrap();
        assert_eq!(DriveFile::from(raw).size, 0);
    }

    #[test]
    fn test_multipart_related_layout() {
        let file = NewFile {
            name: "a.txt".to_string(),
            mime_type: "text/plain".to_string(),
            bytes: b"hello".to_vec(),
        };
        let body = multipart_related("XYZ", &json!({"name": "a.txt"}), &file);
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--XYZ\r\nContent-Type: application/json"));
        assert!(text.contains("Content-Type: text/plain\r\n\r\nhello\r\n--XYZ--\r\n"));
    }

    #[test]
    fn test_multipart_related_rejects_injected_media_type() {
        let file = NewFile {
            name: "a.txt".to_string(),
            mime_type: "text/plain\r\n\r\n--XYZ--".to_string(),
            bytes: b"hi".to_vec(),
        };
        let body = multipart_related("XYZ", &json!({"name": "a.txt"}), &file);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("Content-Type: application/octet-stream\r\n\r\nhi"));
        assert_eq!(text.matches("--XYZ--").count(), 1);
    }

    #[test]
    fn test_with_base_url() {
        let drive = GoogleDrive::new().unwrap().with_base_url("http://127.0.0.1:9/");
        assert_eq!(drive.api_url, "http://127.0.0.1:9/drive/v3");
        assert_eq!(drive.userinfo_url, "http://127.0.0.1:9/oauth2/v2/userinfo");
    }
}
