//! Remote operations of the upload modal.
//!
//! Each function performs the calls for one user action and returns the
//! [`UploadEvent`] to feed back into [`UploadState::apply`]. Bulk actions
//! run their requests in parallel and report every item's outcome.

use super::state::{DeleteScope, UploadEvent, UploadState, UploadTarget};
use super::validation::validate_uploads;
use crate::api::{FileApi, FileUpload};
use crate::error::{Result, SheetpilotError};
use crate::model::{BatchRecord, FileRecord};
use async_trait::async_trait;
use futures::future::join_all;

/// Per-item outcome of a bulk request.
#[derive(Debug)]
pub struct BulkReport<T> {
    pub succeeded: Vec<T>,
    /// Item label and the error it failed with
    pub failed: Vec<(String, SheetpilotError)>,
}

impl<T> Default for BulkReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BulkReport<T> {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Called before creating a group for a flow that has never been saved.
/// Resolves to the id of the saved flow.
#[async_trait]
pub trait EnsureFlowSaved: Send + Sync {
    async fn ensure_flow_saved(&self) -> Result<i64>;
}

/// Lists the user's files and the groups of `flow_id`. An unsaved flow has
/// no groups.
pub async fn load(
    api: &dyn FileApi,
    flow_id: Option<i64>,
) -> Result<(Vec<FileRecord>, Vec<BatchRecord>)> {
    match flow_id {
        Some(id) => futures::try_join!(api.list_files(), api.list_batches(Some(id))),
        None => Ok((api.list_files().await?, Vec::new())),
    }
}

pub async fn upload(
    api: &dyn FileApi,
    uploads: Vec<FileUpload>,
    target: UploadTarget,
) -> UploadEvent {
    if let Err(e) = validate_uploads(&uploads) {
        return UploadEvent::UploadRejected(e);
    }
    let batch_id = match target {
        UploadTarget::Individual => None,
        UploadTarget::Group(id) => Some(id),
    };
    tracing::info!(count = uploads.len(), ?batch_id, "Uploading files");
    let outcomes = join_all(uploads.iter().map(|u| api.upload_file(u, batch_id))).await;
    let mut report = BulkReport::default();
    for (upload, outcome) in uploads.iter().zip(outcomes) {
        match outcome {
            Ok(file) => report.succeeded.push(file),
            Err(e) => report.failed.push((upload.file_name.clone(), e)),
        }
    }
    UploadEvent::Uploaded { target, report }
}

/// Creates a group named `name`, saving the flow through `hook` first when
/// it has no id yet. A hook failure creates nothing.
pub async fn create_group(
    api: &dyn FileApi,
    name: &str,
    flow_id: Option<i64>,
    hook: &dyn EnsureFlowSaved,
) -> UploadEvent {
    let name = name.trim();
    if name.is_empty() {
        return UploadEvent::GroupRejected(SheetpilotError::Validation(
            "Enter a name for the group".to_owned(),
        ));
    }
    let flow_id = match flow_id {
        Some(id) => id,
        None => match hook.ensure_flow_saved().await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Flow could not be saved before creating a group");
                return UploadEvent::GroupRejected(SheetpilotError::Validation(format!(
                    "Save the flow before creating a group ({})",
                    e.user_message("save failed")
                )));
            }
        },
    };
    let outcome = api.create_batch(name, Some(flow_id)).await;
    if let Ok(batch) = &outcome {
        tracing::info!(batch_id = batch.id, flow_id, "Group created");
    }
    UploadEvent::GroupCreated { flow_id, outcome }
}

/// Deletes files in parallel. `files` pairs each id with a display label.
pub async fn delete_files(api: &dyn FileApi, files: Vec<(i64, String)>) -> UploadEvent {
    UploadEvent::FilesDeleted(delete_each(files, |id| api.delete_file(id)).await)
}

/// Deletes whole groups in parallel.
pub async fn delete_groups(api: &dyn FileApi, groups: Vec<(i64, String)>) -> UploadEvent {
    UploadEvent::GroupsDeleted(delete_each(groups, |id| api.delete_batch(id)).await)
}

async fn delete_each<F, Fut>(items: Vec<(i64, String)>, delete: F) -> BulkReport<i64>
where
    F: Fn(i64) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let outcomes = join_all(items.iter().map(|(id, _)| delete(*id))).await;
    let mut report = BulkReport::default();
    for ((id, label), outcome) in items.into_iter().zip(outcomes) {
        match outcome {
            Ok(()) => report.succeeded.push(id),
            Err(e) => report.failed.push((label, e)),
        }
    }
    tracing::info!(
        deleted = report.succeeded.len(),
        failed = report.failed.len(),
        "Bulk delete finished"
    );
    report
}

pub async fn load_sheets(api: &dyn FileApi, file_id: i64) -> UploadEvent {
    UploadEvent::SheetsLoaded {
        file_id,
        sheets: api.list_sheets(file_id).await,
    }
}

pub async fn load_preview(api: &dyn FileApi, file_id: i64, sheet: Option<String>) -> UploadEvent {
    let preview = api.preview_file(file_id, sheet.as_deref()).await;
    UploadEvent::PreviewLoaded {
        file_id,
        sheet,
        preview,
    }
}

/// Drives an [`UploadState`] directly against an API, awaiting each action.
/// Used by the CLI and by tests; the GUI runs the same operations on its
/// background runtime instead.
pub struct UploadSession<'a> {
    api: &'a dyn FileApi,
    pub state: UploadState,
}

impl<'a> UploadSession<'a> {
    pub fn new(api: &'a dyn FileApi) -> Self {
        Self {
            api,
            state: UploadState::new(),
        }
    }

    pub async fn open(&mut self, flow_id: Option<i64>) {
        let generation = self.state.open(flow_id);
        let outcome = load(self.api, flow_id).await;
        self.state.apply(generation, UploadEvent::Loaded(outcome));
    }

    pub async fn upload(&mut self, uploads: Vec<FileUpload>, target: UploadTarget) {
        let generation = self.state.generation();
        self.state.begin_upload();
        let event = upload(self.api, uploads, target).await;
        self.state.apply(generation, event);
    }

    pub async fn create_group(&mut self, name: &str, hook: &dyn EnsureFlowSaved) {
        let generation = self.state.generation();
        self.state.begin_create_group();
        let event = create_group(self.api, name, self.state.flow_id(), hook).await;
        self.state.apply(generation, event);
    }

    /// Runs one of the delete actions. Nothing is sent when the scope is
    /// empty.
    pub async fn delete(&mut self, scope: DeleteScope) {
        let items = self.state.delete_candidates(scope);
        if items.is_empty() {
            return;
        }
        let generation = self.state.generation();
        self.state.begin_delete();
        let event = match scope {
            DeleteScope::AllGroups => delete_groups(self.api, items).await,
            _ => delete_files(self.api, items).await,
        };
        self.state.apply(generation, event);
    }

    pub async fn preview(&mut self, file_id: i64) {
        if !self.state.begin_preview(file_id) {
            return;
        }
        let generation = self.state.generation();
        let sheets = load_sheets(self.api, file_id).await;
        self.state.apply(generation, sheets);
        let event = load_preview(self.api, file_id, None).await;
        self.state.apply(generation, event);
    }

    pub async fn select_sheet(&mut self, sheet: Option<String>) {
        let Some(file_id) = self.state.preview().map(|p| p.file_id) else {
            return;
        };
        if !self.state.select_sheet(sheet.clone()) {
            return;
        }
        let generation = self.state.generation();
        let event = load_preview(self.api, file_id, sheet).await;
        self.state.apply(generation, event);
    }
}
