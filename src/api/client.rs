//! HTTP client for the SheetPilot backend.

use super::types::{
    BatchCreateRequest, ExecuteRequest, ExecuteResponse, ExportedFile, FileUpload,
    FlowCreateRequest, FlowUpdateRequest, OutputListing, PrecomputeResponse, SheetList,
    StepPreviewRequest,
};
use super::{FileApi, FlowApi, TransformApi};
use crate::error::{Result, SheetpilotError, extract_detail};
use crate::model::{BatchRecord, FilePreview, FileRecord, FlowData, FlowRecord};
use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Talks to `{base_url}/api/...`, authenticating with a bearer token when one
/// is configured.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<SecretString>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api{path}", self.base_url);
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Turns a non-success response into [`SheetpilotError::Api`], keeping the
    /// server's `detail` message when the body has one.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        tracing::warn!(status = status.as_u16(), detail = ?detail, "Backend request failed");
        Err(SheetpilotError::Api {
            status: status.as_u16(),
            detail,
        })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(builder: RequestBuilder) -> Result<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl FlowApi for ApiClient {
    async fn list_flows(&self) -> Result<Vec<FlowRecord>> {
        Self::send_json(self.request(Method::GET, "/flows")).await
    }

    async fn get_flow(&self, id: i64) -> Result<FlowRecord> {
        Self::send_json(self.request(Method::GET, &format!("/flows/{id}"))).await
    }

    async fn create_flow(&self, name: &str, flow_data: &FlowData) -> Result<FlowRecord> {
        let body = FlowCreateRequest {
            name,
            description: None,
            flow_data,
        };
        Self::send_json(self.request(Method::POST, "/flows").json(&body)).await
    }

    async fn update_flow(&self, id: i64, name: &str, flow_data: &FlowData) -> Result<FlowRecord> {
        let body = FlowUpdateRequest { name, flow_data };
        Self::send_json(
            self.request(Method::PUT, &format!("/flows/{id}"))
                .json(&body),
        )
        .await
    }
}

#[async_trait]
impl FileApi for ApiClient {
    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        Self::send_json(self.request(Method::GET, "/files")).await
    }

    async fn upload_file(
        &self,
        upload: &FileUpload,
        batch_id: Option<i64>,
    ) -> Result<FileRecord> {
        let mut part = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone());
        if let Some(mime) = &upload.mime_type {
            part = part.mime_str(mime)?;
        }
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(batch_id) = batch_id {
            form = form.text("batch_id", batch_id.to_string());
        }
        tracing::debug!(file = %upload.file_name, ?batch_id, "Uploading file");
        Self::send_json(self.request(Method::POST, "/files/upload").multipart(form)).await
    }

    async fn delete_file(&self, id: i64) -> Result<()> {
        Self::send_empty(self.request(Method::DELETE, &format!("/files/{id}"))).await
    }

    async fn preview_file(&self, id: i64, sheet: Option<&str>) -> Result<FilePreview> {
        let mut builder = self.request(Method::GET, &format!("/files/{id}/preview"));
        if let Some(sheet) = sheet {
            builder = builder.query(&[("sheet", sheet)]);
        }
        Self::send_json(builder).await
    }

    async fn list_sheets(&self, id: i64) -> Result<Vec<String>> {
        let list: SheetList =
            Self::send_json(self.request(Method::GET, &format!("/files/{id}/sheets"))).await?;
        Ok(list.sheets)
    }

    async fn list_batches(&self, flow_id: Option<i64>) -> Result<Vec<BatchRecord>> {
        let mut builder = self.request(Method::GET, "/files/batches");
        if let Some(flow_id) = flow_id {
            builder = builder.query(&[("flow_id", flow_id)]);
        }
        Self::send_json(builder).await
    }

    async fn create_batch(&self, name: &str, flow_id: Option<i64>) -> Result<BatchRecord> {
        let body = BatchCreateRequest { name, flow_id };
        Self::send_json(self.request(Method::POST, "/files/batches").json(&body)).await
    }

    async fn delete_batch(&self, id: i64) -> Result<()> {
        Self::send_empty(self.request(Method::DELETE, &format!("/files/batches/{id}"))).await
    }
}

#[async_trait]
impl TransformApi for ApiClient {
    async fn preview_step(&self, request: &StepPreviewRequest) -> Result<FilePreview> {
        Self::send_json(
            self.request(Method::POST, "/transform/preview-step")
                .json(request),
        )
        .await
    }

    async fn execute(&self, request: &ExecuteRequest<'_>) -> Result<ExecuteResponse> {
        Self::send_json(self.request(Method::POST, "/transform/execute").json(request)).await
    }

    async fn export(&self, request: &ExecuteRequest<'_>) -> Result<ExportedFile> {
        let response = Self::check(
            self.request(Method::POST, "/transform/export")
                .json(request)
                .send()
                .await?,
        )
        .await?;
        let header_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(crate::export::filename_from_content_disposition);
        let bytes = response.bytes().await?.to_vec();
        let file_name = header_name.unwrap_or_else(|| {
            crate::export::expected_download_name(&crate::export::output_config_of(
                request.flow_data,
            ))
        });
        Ok(ExportedFile { file_name, bytes })
    }

    async fn precompute(&self, request: &ExecuteRequest<'_>) -> Result<PrecomputeResponse> {
        Self::send_json(
            self.request(Method::POST, "/transform/precompute")
                .json(request),
        )
        .await
    }

    async fn list_outputs(&self) -> Result<OutputListing> {
        Self::send_json(self.request(Method::GET, "/transform/list-outputs")).await
    }
}
