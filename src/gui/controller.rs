//! Background work for the GUI.
//!
//! Every backend call runs on a tokio runtime owned by the [`Controller`].
//! Results come back as [`AppMessage`]s over a crossbeam channel that the
//! app drains once per frame; each task asks egui for a repaint when done.

use crate::api::{
    Backend, ExecuteRequest, ExecuteResponse, FileApi, FileUpload, OutputListing,
    PrecomputeResponse, PreviewTarget, StepPreviewRequest,
};
use crate::error::{Result, SheetpilotError};
use crate::model::{FilePreview, FlowData, FlowRecord};
use crate::store::{FlowSnapshot, save_flow};
use crate::upload::{DeleteScope, EnsureFlowSaved, UploadEvent, UploadTarget, ops};
use async_trait::async_trait;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
pub enum AppMessage {
    FlowsListed(Result<Vec<FlowRecord>>),
    FlowLoaded(Result<FlowRecord>),
    FlowSaved {
        revision: u64,
        outcome: Result<FlowRecord>,
    },
    Upload {
        generation: u64,
        event: UploadEvent,
    },
    StepPreview {
        node_id: String,
        outcome: Result<FilePreview>,
    },
    Executed(Result<ExecuteResponse>),
    Exported(Result<PathBuf>),
    Precomputed(Result<PrecomputeResponse>),
    OutputsListed(Result<OutputListing>),
}

/// Saves the flow before a group is created for it, reporting the save to
/// the app like any other save.
struct SaveBeforeGroup {
    api: Arc<dyn Backend>,
    snapshot: Option<FlowSnapshot>,
    tx: Sender<AppMessage>,
}

#[async_trait]
impl EnsureFlowSaved for SaveBeforeGroup {
    async fn ensure_flow_saved(&self) -> Result<i64> {
        let Some(snapshot) = &self.snapshot else {
            return Err(SheetpilotError::Validation(
                "Save the flow first".to_owned(),
            ));
        };
        let outcome = save_flow(self.api.as_ref(), snapshot).await;
        let (message, result) = match outcome {
            Ok(record) => {
                let id = record.id;
                (Ok(record), Ok(id))
            }
            Err(e) => (Err(SheetpilotError::Other(e.to_string())), Err(e)),
        };
        let sent = self.tx.send(AppMessage::FlowSaved {
            revision: snapshot.revision,
            outcome: message,
        });
        if sent.is_err() {
            tracing::error!("Failed to send save result");
        }
        result
    }
}

pub struct Controller {
    runtime: tokio::runtime::Runtime,
    api: Arc<dyn Backend>,
    tx: Sender<AppMessage>,
    rx: Receiver<AppMessage>,
}

impl Controller {
    pub fn new(api: Arc<dyn Backend>) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        Ok(Self {
            runtime: crate::utils::build_runtime()?,
            api,
            tx,
            rx,
        })
    }

    pub fn set_api(&mut self, api: Arc<dyn Backend>) {
        self.api = api;
    }

    /// Messages that arrived since the last frame.
    pub fn drain(&self) -> Vec<AppMessage> {
        self.rx.try_iter().collect()
    }

    fn spawn<F>(&self, ctx: &egui::Context, task: F)
    where
        F: Future<Output = AppMessage> + Send + 'static,
    {
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let message = task.await;
            if tx.send(message).is_err() {
                tracing::error!("Failed to send result");
            }
            ctx.request_repaint();
        });
    }

    pub fn list_flows(&self, ctx: &egui::Context) {
        let api = Arc::clone(&self.api);
        self.spawn(ctx, async move {
            AppMessage::FlowsListed(api.list_flows().await)
        });
    }

    pub fn load_flow(&self, ctx: &egui::Context, id: i64) {
        let api = Arc::clone(&self.api);
        self.spawn(ctx, async move { AppMessage::FlowLoaded(api.get_flow(id).await) });
    }

    pub fn save_flow(&self, ctx: &egui::Context, snapshot: FlowSnapshot) {
        let api = Arc::clone(&self.api);
        self.spawn(ctx, async move {
            let outcome = save_flow(api.as_ref(), &snapshot).await;
            AppMessage::FlowSaved {
                revision: snapshot.revision,
                outcome,
            }
        });
    }

    fn spawn_upload<F, Fut>(&self, ctx: &egui::Context, generation: u64, op: F)
    where
        F: FnOnce(Arc<dyn Backend>) -> Fut + Send + 'static,
        Fut: Future<Output = UploadEvent> + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        self.spawn(ctx, async move {
            AppMessage::Upload {
                generation,
                event: op(api).await,
            }
        });
    }

    pub fn load_files(&self, ctx: &egui::Context, generation: u64, flow_id: Option<i64>) {
        self.spawn_upload(ctx, generation, move |api| async move {
            UploadEvent::Loaded(ops::load(api.as_ref(), flow_id).await)
        });
    }

    pub fn upload_files(
        &self,
        ctx: &egui::Context,
        generation: u64,
        uploads: Vec<FileUpload>,
        target: UploadTarget,
    ) {
        self.spawn_upload(ctx, generation, move |api| async move {
            ops::upload(api.as_ref(), uploads, target).await
        });
    }

    /// Creates a group. `pending_save` is the snapshot of an unsaved flow,
    /// saved before the group is created.
    pub fn create_group(
        &self,
        ctx: &egui::Context,
        generation: u64,
        name: String,
        flow_id: Option<i64>,
        pending_save: Option<FlowSnapshot>,
    ) {
        let hook = SaveBeforeGroup {
            api: Arc::clone(&self.api),
            snapshot: pending_save,
            tx: self.tx.clone(),
        };
        self.spawn_upload(ctx, generation, move |api| async move {
            ops::create_group(api.as_ref(), &name, flow_id, &hook).await
        });
    }

    pub fn delete(
        &self,
        ctx: &egui::Context,
        generation: u64,
        scope: DeleteScope,
        items: Vec<(i64, String)>,
    ) {
        self.spawn_upload(ctx, generation, move |api| async move {
            let files: &dyn FileApi = api.as_ref();
            match scope {
                DeleteScope::AllGroups => ops::delete_groups(files, items).await,
                DeleteScope::File(_) | DeleteScope::GroupFiles(_) | DeleteScope::AllIndividual => {
                    ops::delete_files(files, items).await
                }
            }
        });
    }

    pub fn preview_file(
        &self,
        ctx: &egui::Context,
        generation: u64,
        file_id: i64,
        sheet: Option<String>,
        with_sheets: bool,
    ) {
        if with_sheets {
            self.spawn_upload(ctx, generation, move |api| async move {
                ops::load_sheets(api.as_ref(), file_id).await
            });
        }
        self.spawn_upload(ctx, generation, move |api| async move {
            ops::load_preview(api.as_ref(), file_id, sheet).await
        });
    }

    pub fn preview_step(&self, ctx: &egui::Context, node_id: String, request: StepPreviewRequest) {
        let api = Arc::clone(&self.api);
        self.spawn(ctx, async move {
            AppMessage::StepPreview {
                node_id,
                outcome: api.preview_step(&request).await,
            }
        });
    }

    pub fn execute(
        &self,
        ctx: &egui::Context,
        flow_data: FlowData,
        preview_target: Option<PreviewTarget>,
    ) {
        let api = Arc::clone(&self.api);
        self.spawn(ctx, async move {
            let request = ExecuteRequest::for_flow(&flow_data, preview_target);
            AppMessage::Executed(api.execute(&request).await)
        });
    }

    pub fn precompute(&self, ctx: &egui::Context, flow_data: FlowData) {
        let api = Arc::clone(&self.api);
        self.spawn(ctx, async move {
            let request = ExecuteRequest::for_flow(&flow_data, None);
            AppMessage::Precomputed(api.precompute(&request).await)
        });
    }

    pub fn list_outputs(&self, ctx: &egui::Context) {
        let api = Arc::clone(&self.api);
        self.spawn(ctx, async move {
            AppMessage::OutputsListed(api.list_outputs().await)
        });
    }

    pub fn export(&self, ctx: &egui::Context, flow_data: FlowData, dir: PathBuf) {
        let api = Arc::clone(&self.api);
        self.spawn(ctx, async move {
            AppMessage::Exported(crate::export::export_flow(api.as_ref(), &flow_data, &dir).await)
        });
    }
}
