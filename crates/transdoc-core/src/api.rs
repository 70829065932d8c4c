//! Remote task accessor: stateless request functions against the translation backend.
//!
//! Every call is a single request/response. Nothing is retained between calls, so
//! the accessor can be shared freely between the poll loops and user actions.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::model::{
    Block, BlockId, CreatedTask, DocumentUpload, ExportedDocument, Settings, TaskId,
    TaskProgress,
};
use crate::CoreError;

/// Request/response contract of the translation backend.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// `GET /api/health`.
    async fn health(&self) -> Result<(), CoreError>;

    /// `GET /api/settings`.
    async fn get_settings(&self) -> Result<Settings, CoreError>;

    /// `POST /api/settings`.
    async fn save_settings(&self, settings: &Settings) -> Result<(), CoreError>;

    /// `POST /api/tasks` (multipart: file, direction).
    async fn create_task(&self, upload: &DocumentUpload) -> Result<CreatedTask, CoreError>;

    /// `POST /api/tasks/{id}/run_translate`. Returns the backend's status echo.
    async fn run_translate(&self, task_id: &TaskId) -> Result<serde_json::Value, CoreError>;

    /// `GET /api/tasks/{id}`.
    async fn task_progress(&self, task_id: &TaskId) -> Result<TaskProgress, CoreError>;

    /// `GET /api/tasks/{id}/blocks?offset&limit`, ordered by `order_no`.
    async fn list_blocks(
        &self,
        task_id: &TaskId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Block>, CoreError>;

    /// `PATCH /api/tasks/{id}/blocks/{block_id}` with `{translated_text}`.
    async fn update_block(
        &self,
        task_id: &TaskId,
        block_id: &BlockId,
        translated_text: &str,
    ) -> Result<serde_json::Value, CoreError>;

    /// `GET /api/tasks/{id}/export`.
    async fn export(&self, task_id: &TaskId) -> Result<ExportedDocument, CoreError>;
}

/// [`TaskApi`] over HTTP with reqwest.
#[derive(Clone)]
pub struct HttpTaskApi {
    base_url: String,
    client: reqwest::Client,
}

impl fmt::Debug for HttpTaskApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTaskApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpTaskApi {
    /// Build a client for `base_url` (e.g. `http://127.0.0.1:8000`).
    ///
    /// `request_timeout` of `None` leaves requests unbounded; a hung fetch then only
    /// delays its own tick.
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self, CoreError> {
        let mut builder = reqwest::Client::builder().user_agent("transdoc/0.1");
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// `/api/tasks/{id}` followed by `rest`. Ids are opaque, so they are percent-encoded.
fn task_path(task_id: &TaskId, rest: &str) -> String {
    format!("/api/tasks/{}{rest}", urlencoding::encode(task_id.as_str()))
}

fn block_path(task_id: &TaskId, block_id: &BlockId) -> String {
    task_path(
        task_id,
        &format!("/blocks/{}", urlencoding::encode(block_id.as_str())),
    )
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn health(&self) -> Result<(), CoreError> {
        let resp = self.client.get(self.url("/api/health")).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn get_settings(&self) -> Result<Settings, CoreError> {
        let resp = self.client.get(self.url("/api/settings")).send().await?;
        decode(resp).await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        let resp = self
            .client
            .post(self.url("/api/settings"))
            .json(settings)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn create_task(&self, upload: &DocumentUpload) -> Result<CreatedTask, CoreError> {
        let part = Part::bytes(upload.bytes.clone()).file_name(upload.filename.clone());
        let form = Form::new()
            .part("file", part)
            .text("direction", upload.direction.as_str());
        let resp = self
            .client
            .post(self.url("/api/tasks"))
            .multipart(form)
            .send()
            .await?;
        decode(resp).await
    }

    async fn run_translate(&self, task_id: &TaskId) -> Result<serde_json::Value, CoreError> {
        let resp = self
            .client
            .post(self.url(&task_path(task_id, "/run_translate")))
            .send()
            .await?;
        decode(resp).await
    }

    async fn task_progress(&self, task_id: &TaskId) -> Result<TaskProgress, CoreError> {
        let resp = self
            .client
            .get(self.url(&task_path(task_id, "")))
            .send()
            .await?;
        decode(resp).await
    }

    async fn list_blocks(
        &self,
        task_id: &TaskId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Block>, CoreError> {
        let resp = self
            .client
            .get(self.url(&task_path(task_id, "/blocks")))
            .query(&[("offset", offset), ("limit", limit)])
            .send()
            .await?;
        decode(resp).await
    }

    async fn update_block(
        &self,
        task_id: &TaskId,
        block_id: &BlockId,
        translated_text: &str,
    ) -> Result<serde_json::Value, CoreError> {
        let resp = self
            .client
            .patch(self.url(&block_path(task_id, block_id)))
            .json(&json!({ "translated_text": translated_text }))
            .send()
            .await?;
        decode(resp).await
    }

    async fn export(&self, task_id: &TaskId) -> Result<ExportedDocument, CoreError> {
        let resp = self
            .client
            .get(self.url(&task_path(task_id, "/export")))
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let filename = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| default_export_name(task_id));
        let bytes = resp.bytes().await?.to_vec();
        Ok(ExportedDocument { filename, bytes })
    }
}

/// Turn a non-2xx response into [`CoreError::Api`] carrying the body as message.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, CoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        body
    };
    Err(CoreError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, CoreError> {
    let resp = check_status(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Fallback file name when the export response carries no usable disposition.
pub fn default_export_name(task_id: &TaskId) -> String {
    format!("translated_{task_id}.docx")
}

/// Extract a bare file name from a `Content-Disposition` header value.
///
/// Prefers `filename*=` (RFC 5987, percent-decoded) over `filename=`. Any directory
/// components are stripped.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in value.split(';').map(str::trim) {
        if let Some(rest) = param.strip_prefix("filename*=") {
            let encoded = rest.rsplit("''").next().unwrap_or(rest);
            extended = Some(percent_decode(encoded.trim_matches('"')));
        } else if let Some(rest) = param.strip_prefix("filename=") {
            plain = Some(rest.trim_matches('"').to_string());
        }
    }
    let name = extended.or(plain)?;
    let name = name.rsplit(['/', '\\']).next().unwrap_or("").trim().to_string();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

fn percent_decode(s: &str) -> String {
    match urlencoding::decode(s) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(s.as_bytes())).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_plain_filename() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="translated_report.docx""#),
            Some("translated_report.docx".to_string())
        );
    }

    #[test]
    fn disposition_prefers_extended_filename() {
        assert_eq!(
            filename_from_disposition(
                "attachment; filename=\"fallback.docx\"; filename*=utf-8''translated_%E6%8A%A5%E5%91%8A.docx"
            ),
            Some("translated_报告.docx".to_string())
        );
    }

    #[test]
    fn disposition_strips_directories() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="../../etc/passwd""#),
            Some("passwd".to_string())
        );
        assert_eq!(filename_from_disposition(r#"attachment; filename="..""#), None);
    }

    #[test]
    fn disposition_without_filename() {
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[test]
    fn default_name_uses_task_id() {
        assert_eq!(
            default_export_name(&TaskId::new("task_1")),
            "translated_task_1.docx"
        );
    }

    #[test]
    fn ids_are_encoded_in_paths() {
        let task_id = TaskId::new("a b#1");
        assert_eq!(task_path(&task_id, "/export"), "/api/tasks/a%20b%231/export");
        assert_eq!(
            block_path(&task_id, &BlockId::new("x#y/z")),
            "/api/tasks/a%20b%231/blocks/x%23y%2Fz"
        );
        assert_eq!(task_path(&TaskId::new("task_1"), ""), "/api/tasks/task_1");
    }

    #[test]
    fn disposition_with_invalid_utf8_is_lossy() {
        assert_eq!(
            filename_from_disposition("attachment; filename*=utf-8''bad%FF.docx"),
            Some("bad\u{FFFD}.docx".to_string())
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpTaskApi::new("http://127.0.0.1:8000/", None).unwrap();
        assert_eq!(api.base_url(), "http://127.0.0.1:8000");
        assert_eq!(api.url("/api/health"), "http://127.0.0.1:8000/api/health");
    }
}
