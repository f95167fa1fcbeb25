//! Backend API seams.
//!
//! The flow builder consumes three groups of endpoints. Each group is a
//! trait so the upload modal and flow persistence can run against the HTTP
//! [`ApiClient`] in the app and against an in-memory backend in tests.

pub mod client;
pub mod types;

use crate::error::Result;
use crate::model::{BatchRecord, FilePreview, FileRecord, FlowData, FlowRecord};
use async_trait::async_trait;

pub use client::ApiClient;
pub use types::{
    ExecuteRequest, ExecuteResponse, ExportedFile, FileUpload, OutputListing, PrecomputeResponse,
    PreviewTarget, StepPreviewRequest,
};

/// `/api/flows`
#[async_trait]
pub trait FlowApi: Send + Sync {
    async fn list_flows(&self) -> Result<Vec<FlowRecord>>;
    async fn get_flow(&self, id: i64) -> Result<FlowRecord>;
    async fn create_flow(&self, name: &str, flow_data: &FlowData) -> Result<FlowRecord>;
    async fn update_flow(&self, id: i64, name: &str, flow_data: &FlowData) -> Result<FlowRecord>;
}

/// `/api/files` and `/api/files/batches`
#[async_trait]
pub trait FileApi: Send + Sync {
    async fn list_files(&self) -> Result<Vec<FileRecord>>;
    async fn upload_file(&self, upload: &FileUpload, batch_id: Option<i64>)
    -> Result<FileRecord>;
    async fn delete_file(&self, id: i64) -> Result<()>;
    async fn preview_file(&self, id: i64, sheet: Option<&str>) -> Result<FilePreview>;
    async fn list_sheets(&self, id: i64) -> Result<Vec<String>>;
    async fn list_batches(&self, flow_id: Option<i64>) -> Result<Vec<BatchRecord>>;
    async fn create_batch(&self, name: &str, flow_id: Option<i64>) -> Result<BatchRecord>;
    async fn delete_batch(&self, id: i64) -> Result<()>;
}

/// `/api/transform`
#[async_trait]
pub trait TransformApi: Send + Sync {
    async fn preview_step(&self, request: &StepPreviewRequest) -> Result<FilePreview>;
    async fn execute(&self, request: &ExecuteRequest<'_>) -> Result<ExecuteResponse>;
    async fn export(&self, request: &ExecuteRequest<'_>) -> Result<ExportedFile>;
    async fn precompute(&self, request: &ExecuteRequest<'_>) -> Result<PrecomputeResponse>;
    async fn list_outputs(&self) -> Result<OutputListing>;
}

/// Everything the GUI talks to.
pub trait Backend: FlowApi + FileApi + TransformApi {}

impl<T: FlowApi + FileApi + TransformApi> Backend for T {}
