//! In-memory backend shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use sheetpilot::api::{
    ExecuteRequest, ExecuteResponse, ExportedFile, FileApi, FileUpload, FlowApi, OutputListing,
    PrecomputeResponse, StepPreviewRequest, TransformApi,
};
use sheetpilot::error::{Result, SheetpilotError};
use sheetpilot::export::{expected_download_name, output_config_of};
use sheetpilot::model::{BatchRecord, FilePreview, FileRecord, FlowData, FlowRecord};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    next_id: i64,
    flows: Vec<FlowRecord>,
    files: Vec<FileRecord>,
    batches: Vec<BatchRecord>,
    failing_deletes: HashSet<i64>,
    fail_saves: bool,
    calls: Vec<String>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Implements every backend trait over plain vectors and records each call.
#[derive(Default)]
pub struct MockBackend {
    inner: Mutex<Inner>,
}

pub fn file_record(id: i64, name: &str, batch_id: Option<i64>) -> FileRecord {
    FileRecord {
        id,
        filename: format!("stored-{id}"),
        original_filename: name.to_owned(),
        file_size: 1024,
        mime_type: String::new(),
        created_at: None,
        batch_id,
    }
}

pub fn xlsx(name: &str) -> FileUpload {
    FileUpload {
        file_name: name.to_owned(),
        mime_type: Some(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_owned(),
        ),
        bytes: b"PK\x03\x04".to_vec(),
    }
}

pub fn csv(name: &str) -> FileUpload {
    FileUpload {
        file_name: name.to_owned(),
        mime_type: Some("text/csv".to_owned()),
        bytes: b"a,b\n1,2\n".to_vec(),
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().expect("mock backend lock");
        f(&mut inner)
    }

    fn record(&self, call: String) {
        self.with(|inner| inner.calls.push(call));
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|inner| inner.calls.clone())
    }

    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn add_batch(&self, name: &str, flow_id: Option<i64>) -> BatchRecord {
        self.with(|inner| {
            let batch = BatchRecord {
                id: inner.next_id(),
                name: name.to_owned(),
                description: None,
                file_count: 0,
                flow_id,
                created_at: None,
            };
            inner.batches.push(batch.clone());
            batch
        })
    }

    pub fn add_file(&self, name: &str, batch_id: Option<i64>) -> FileRecord {
        self.with(|inner| {
            let file = file_record(inner.next_id(), name, batch_id);
            inner.files.push(file.clone());
            if let Some(batch) = inner.batches.iter_mut().find(|b| Some(b.id) == batch_id) {
                batch.file_count += 1;
            }
            file
        })
    }

    pub fn fail_delete(&self, id: i64) {
        self.with(|inner| inner.failing_deletes.insert(id));
    }

    pub fn fail_saves(&self) {
        self.with(|inner| inner.fail_saves = true);
    }

    pub fn files(&self) -> Vec<FileRecord> {
        self.with(|inner| inner.files.clone())
    }

    pub fn batches(&self) -> Vec<BatchRecord> {
        self.with(|inner| inner.batches.clone())
    }

    pub fn flows(&self) -> Vec<FlowRecord> {
        self.with(|inner| inner.flows.clone())
    }
}

fn not_found(what: &str, id: i64) -> SheetpilotError {
    SheetpilotError::Api {
        status: 404,
        detail: Some(format!("{what} {id} not found")),
    }
}

fn sample_preview(columns: &[&str]) -> FilePreview {
    let row: BTreeMap<String, serde_json::Value> = columns
        .iter()
        .map(|c| ((*c).to_owned(), serde_json::json!(format!("{c}-1"))))
        .collect();
    FilePreview {
        columns: columns.iter().map(|c| (*c).to_owned()).collect(),
        row_count: 1,
        preview_rows: vec![row],
        dtypes: BTreeMap::new(),
    }
}

#[async_trait]
impl FlowApi for MockBackend {
    async fn list_flows(&self) -> Result<Vec<FlowRecord>> {
        self.record("list_flows".to_owned());
        Ok(self.flows())
    }

    async fn get_flow(&self, id: i64) -> Result<FlowRecord> {
        self.record(format!("get_flow {id}"));
        self.with(|inner| inner.flows.iter().find(|f| f.id == id).cloned())
            .ok_or_else(|| not_found("Flow", id))
    }

    async fn create_flow(&self, name: &str, flow_data: &FlowData) -> Result<FlowRecord> {
        self.record(format!("create_flow {name}"));
        self.with(|inner| {
            if inner.fail_saves {
                return Err(SheetpilotError::Http("connection refused".to_owned()));
            }
            let record = FlowRecord {
                id: inner.next_id(),
                name: name.to_owned(),
                description: None,
                flow_data: flow_data.clone(),
                created_at: None,
                updated_at: None,
            };
            inner.flows.push(record.clone());
            Ok(record)
        })
    }

    async fn update_flow(&self, id: i64, name: &str, flow_data: &FlowData) -> Result<FlowRecord> {
        self.record(format!("update_flow {id}"));
        self.with(|inner| {
            if inner.fail_saves {
                return Err(SheetpilotError::Http("connection refused".to_owned()));
            }
            let flow = inner
                .flows
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or_else(|| not_found("Flow", id))?;
            flow.name = name.to_owned();
            flow.flow_data = flow_data.clone();
            Ok(flow.clone())
        })
    }
}

#[async_trait]
impl FileApi for MockBackend {
    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.record("list_files".to_owned());
        Ok(self.files())
    }

    async fn upload_file(&self, upload: &FileUpload, batch_id: Option<i64>) -> Result<FileRecord> {
        self.record(format!("upload {}", upload.file_name));
        if let Some(batch_id) = batch_id
            && !self.batches().iter().any(|b| b.id == batch_id)
        {
            return Err(not_found("Batch", batch_id));
        }
        Ok(self.add_file(&upload.file_name, batch_id))
    }

    async fn delete_file(&self, id: i64) -> Result<()> {
        self.record(format!("delete_file {id}"));
        self.with(|inner| {
            if inner.failing_deletes.contains(&id) {
                return Err(SheetpilotError::Api {
                    status: 500,
                    detail: Some(format!("File {id} is locked")),
                });
            }
            let before = inner.files.len();
            inner.files.retain(|f| f.id != id);
            if inner.files.len() == before {
                return Err(not_found("File", id));
            }
            Ok(())
        })
    }

    async fn preview_file(&self, id: i64, sheet: Option<&str>) -> Result<FilePreview> {
        self.record(format!("preview_file {id} {}", sheet.unwrap_or("-")));
        if !self.files().iter().any(|f| f.id == id) {
            return Err(not_found("File", id));
        }
        Ok(sample_preview(&["id", sheet.unwrap_or("Sheet1")]))
    }

    async fn list_sheets(&self, id: i64) -> Result<Vec<String>> {
        self.record(format!("list_sheets {id}"));
        let file = self
            .files()
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| not_found("File", id))?;
        if file.display_name().ends_with(".csv") {
            Ok(Vec::new())
        } else {
            Ok(vec!["Sheet1".to_owned(), "Summary".to_owned()])
        }
    }

    async fn list_batches(&self, flow_id: Option<i64>) -> Result<Vec<BatchRecord>> {
        self.record(format!("list_batches {flow_id:?}"));
        Ok(self
            .batches()
            .into_iter()
            .filter(|b| flow_id.is_none() || b.flow_id == flow_id)
            .collect())
    }

    async fn create_batch(&self, name: &str, flow_id: Option<i64>) -> Result<BatchRecord> {
        self.record(format!("create_batch {name} {flow_id:?}"));
        Ok(self.add_batch(name, flow_id))
    }

    async fn delete_batch(&self, id: i64) -> Result<()> {
        self.record(format!("delete_batch {id}"));
        self.with(|inner| {
            if inner.failing_deletes.contains(&id) {
                return Err(SheetpilotError::Api {
                    status: 500,
                    detail: None,
                });
            }
            let before = inner.batches.len();
            inner.batches.retain(|b| b.id != id);
            if inner.batches.len() == before {
                return Err(not_found("Batch", id));
            }
            inner.files.retain(|f| f.batch_id != Some(id));
            Ok(())
        })
    }
}

#[async_trait]
impl TransformApi for MockBackend {
    async fn preview_step(&self, request: &StepPreviewRequest) -> Result<FilePreview> {
        self.record(format!("preview_step {}", request.file_id));
        Ok(sample_preview(&["id", "step"]))
    }

    async fn execute(&self, request: &ExecuteRequest<'_>) -> Result<ExecuteResponse> {
        self.record(format!("execute {:?}", request.file_ids));
        let preview = sample_preview(&["id", "value"]);
        Ok(ExecuteResponse {
            row_count: preview.row_count,
            column_count: preview.columns.len(),
            preview,
        })
    }

    async fn export(&self, request: &ExecuteRequest<'_>) -> Result<ExportedFile> {
        self.record(format!("export {:?}", request.file_ids));
        Ok(ExportedFile {
            file_name: expected_download_name(&output_config_of(request.flow_data)),
            bytes: b"PK\x03\x04export".to_vec(),
        })
    }

    async fn precompute(&self, request: &ExecuteRequest<'_>) -> Result<PrecomputeResponse> {
        self.record(format!("precompute {:?}", request.file_ids));
        Ok(PrecomputeResponse {
            status: "ok".to_owned(),
            precomputed: request.flow_data.nodes.len(),
        })
    }

    async fn list_outputs(&self) -> Result<OutputListing> {
        self.record("list_outputs".to_owned());
        Ok(OutputListing {
            outputs: Vec::new(),
        })
    }
}
