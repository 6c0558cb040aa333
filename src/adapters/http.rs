use crate::domain::model::{
    ImportResponse, PendingRecord, PersistedPart, PersistedRecord, SaveReceipt, UploadFile,
};
use crate::domain::ports::{ImportSource, RecordBackend};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// 後端 REST API 的 reqwest 用戶端
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: trim_base(base_url.into()),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: trim_base(base_url.into()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        tracing::debug!("📡 API response status: {}", response.status());

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn expect_success(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await?;
        tracing::debug!("📡 API response status: {}", response.status());

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }
        Ok(())
    }

    /// 匯入端點：`success` 為 false 時即使 HTTP 200 也視為失敗
    async fn send_import(&self, request: RequestBuilder) -> Result<Vec<Value>> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("📡 Import response status: {}", status);

        let body: ImportResponse = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(AppError::BackendError {
                    status: status.as_u16(),
                    message: format!("HTTP error! status: {}", status.as_u16()),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if status.is_success() && body.success {
            return Ok(match body.data {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(single) => vec![single],
            });
        }

        Err(AppError::BackendError {
            status: status.as_u16(),
            message: body
                .failure_reason()
                .unwrap_or_else(|| "Failed to read the data".to_string()),
        })
    }
}

fn trim_base(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

async fn backend_error(response: Response) -> AppError {
    let status = response.status().as_u16();
    let body: Option<Value> = response.json().await.ok();

    let message = body
        .as_ref()
        .and_then(|body| body.get("error").or_else(|| body.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP error! status: {}", status));

    tracing::warn!("⚠️ Backend returned {}: {}", status, message);
    AppError::BackendError { status, message }
}

fn file_part(file: UploadFile) -> Result<Part> {
    Ok(Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(file.mime)?)
}

#[async_trait]
impl RecordBackend for ApiClient {
    async fn list_basic_info(&self) -> Result<Vec<PersistedRecord>> {
        self.fetch_json(self.client.get(self.url("/api/basic_info")))
            .await
    }

    async fn list_purchases(&self) -> Result<Vec<PersistedRecord>> {
        self.fetch_json(self.client.get(self.url("/api/purchase_list")))
            .await
    }

    async fn list_parts(&self, parent_id: i64) -> Result<Vec<PersistedPart>> {
        let url = self.url(&format!("/api/parts_info/{}", parent_id));
        self.fetch_json(self.client.get(url)).await
    }

    async fn save_records(&self, records: &[PendingRecord]) -> Result<SaveReceipt> {
        tracing::debug!("📡 POST /api/save_data ({} records)", records.len());
        self.fetch_json(self.client.post(self.url("/api/save_data")).json(records))
            .await
    }

    async fn update_record(&self, id: i64, record: &PersistedRecord) -> Result<()> {
        let url = self.url(&format!("/api/basic_info/{}", id));
        self.expect_success(self.client.put(url).json(record)).await
    }

    async fn update_part(&self, id: i64, part: &PersistedPart) -> Result<()> {
        let url = self.url(&format!("/api/parts_info/{}", id));
        self.expect_success(self.client.put(url).json(part)).await
    }

    async fn delete_record(&self, id: i64) -> Result<()> {
        let url = self.url(&format!("/api/basic_info/{}", id));
        self.expect_success(self.client.delete(url)).await
    }

    async fn delete_part(&self, id: i64) -> Result<()> {
        let url = self.url(&format!("/api/parts_info/{}", id));
        self.expect_success(self.client.delete(url)).await
    }

    async fn delete_all(&self) -> Result<()> {
        self.expect_success(self.client.post(self.url("/api/delete_all_data")))
            .await
    }
}

#[async_trait]
impl ImportSource for ApiClient {
    async fn upload_file(&self, file: UploadFile) -> Result<Vec<Value>> {
        let form = Form::new().part("file", file_part(file)?);
        self.send_import(self.client.post(self.url("/upload")).multipart(form))
            .await
    }

    async fn analyze_images(&self, files: Vec<UploadFile>) -> Result<Vec<Value>> {
        let mut form = Form::new();
        for file in files {
            form = form.part("files", file_part(file)?);
        }
        self.send_import(
            self.client
                .post(self.url("/api/dify/fetch-data-multiple"))
                .multipart(form),
        )
        .await
    }
}
