//! State of the data upload modal.
//!
//! [`UploadState`] holds the files of the current flow split into per-group
//! buckets and a residual list of individual files. Remote work runs
//! elsewhere (see [`super::ops`]) and comes back as [`UploadEvent`]s tagged
//! with the generation they were started in; events from an older opening of
//! the modal are dropped.

use super::ops::BulkReport;
use crate::error::SheetpilotError;
use crate::model::{BatchRecord, FilePreview, FileRecord};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Where new uploads go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadTarget {
    #[default]
    Individual,
    Group(i64),
}

/// What a delete action removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    File(i64),
    /// Every file in one group; the group itself stays
    GroupFiles(i64),
    AllIndividual,
    /// Every group of the flow, with its files
    AllGroups,
}

/// A file group and the files currently assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchBucket {
    pub batch: BatchRecord,
    pub files: Vec<FileRecord>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreviewState {
    pub file_id: i64,
    pub file_name: String,
    pub sheets: Vec<String>,
    pub sheet: Option<String>,
    pub data: Option<FilePreview>,
    pub loading: bool,
}

/// Something the owner of the modal has to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Sorted, de-duplicated ids of every file in the modal
    IncludedFiles(Vec<i64>),
    /// Files were deleted on the server; the flow should be re-saved
    FlowModified,
    /// A group was created after the flow received this id
    FlowSaved(i64),
    Alert(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusyFlags {
    pub loading: bool,
    pub uploading: bool,
    pub deleting: bool,
    pub creating_group: bool,
}

impl BusyFlags {
    pub fn any(self) -> bool {
        self.loading || self.uploading || self.deleting || self.creating_group
    }
}

/// Result of one remote operation started by the modal.
#[derive(Debug)]
pub enum UploadEvent {
    Loaded(crate::error::Result<(Vec<FileRecord>, Vec<BatchRecord>)>),
    Uploaded {
        target: UploadTarget,
        report: BulkReport<FileRecord>,
    },
    /// Validation or hook failure before any upload started
    UploadRejected(SheetpilotError),
    GroupCreated {
        flow_id: i64,
        outcome: crate::error::Result<BatchRecord>,
    },
    GroupRejected(SheetpilotError),
    FilesDeleted(BulkReport<i64>),
    GroupsDeleted(BulkReport<i64>),
    SheetsLoaded {
        file_id: i64,
        sheets: crate::error::Result<Vec<String>>,
    },
    PreviewLoaded {
        file_id: i64,
        sheet: Option<String>,
        preview: crate::error::Result<FilePreview>,
    },
}

#[derive(Debug, Default)]
pub struct UploadState {
    generation: u64,
    open: bool,
    flow_id: Option<i64>,
    batches: Vec<BatchBucket>,
    individual: Vec<FileRecord>,
    preview: Option<PreviewState>,
    last_emitted: Option<Vec<i64>>,
    busy: BusyFlags,
    notices: VecDeque<Notice>,
    pub target: UploadTarget,
    pub new_group_name: String,
}

impl UploadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the modal for `flow_id` and starts a new generation.
    pub fn open(&mut self, flow_id: Option<i64>) -> u64 {
        let generation = self.begin_load(flow_id);
        self.open = true;
        tracing::debug!(generation, ?flow_id, "Upload modal opened");
        generation
    }

    /// Starts a fresh listing for `flow_id` without showing the modal.
    /// Earlier responses become stale.
    pub fn begin_load(&mut self, flow_id: Option<i64>) -> u64 {
        self.generation += 1;
        self.flow_id = flow_id;
        self.batches.clear();
        self.individual.clear();
        self.preview = None;
        self.last_emitted = None;
        self.busy = BusyFlags {
            loading: true,
            ..BusyFlags::default()
        };
        self.target = UploadTarget::Individual;
        self.generation
    }

    /// Closes the modal. Responses still in flight become stale.
    pub fn close(&mut self) {
        self.generation += 1;
        self.open = false;
        self.preview = None;
        self.busy = BusyFlags::default();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn flow_id(&self) -> Option<i64> {
        self.flow_id
    }

    /// Adopts the id of a flow that was saved while the modal was open.
    pub fn set_flow_id(&mut self, flow_id: i64) {
        self.flow_id = Some(flow_id);
    }

    pub fn busy(&self) -> BusyFlags {
        self.busy
    }

    pub fn batches(&self) -> &[BatchBucket] {
        &self.batches
    }

    pub fn bucket(&self, batch_id: i64) -> Option<&BatchBucket> {
        self.batches.iter().find(|b| b.batch.id == batch_id)
    }

    pub fn individual(&self) -> &[FileRecord] {
        &self.individual
    }

    pub fn preview(&self) -> Option<&PreviewState> {
        self.preview.as_ref()
    }

    /// Ids of every file in both buckets, sorted and de-duplicated.
    pub fn included_ids(&self) -> Vec<i64> {
        self.batches
            .iter()
            .flat_map(|b| b.files.iter())
            .chain(self.individual.iter())
            .map(|f| f.id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every known file, grouped files carrying their batch id.
    pub fn all_files(&self) -> Vec<FileRecord> {
        self.batches
            .iter()
            .flat_map(|b| b.files.iter())
            .chain(self.individual.iter())
            .cloned()
            .collect()
    }

    pub fn group_ids(&self) -> Vec<i64> {
        self.batches.iter().map(|b| b.batch.id).collect()
    }

    pub fn file_ids_in_group(&self, batch_id: i64) -> Vec<i64> {
        self.bucket(batch_id)
            .map(|b| b.files.iter().map(|f| f.id).collect())
            .unwrap_or_default()
    }

    pub fn individual_ids(&self) -> Vec<i64> {
        self.individual.iter().map(|f| f.id).collect()
    }

    /// Ids and display labels of what `scope` would delete. Group ids for
    /// [`DeleteScope::AllGroups`], file ids otherwise.
    pub fn delete_candidates(&self, scope: DeleteScope) -> Vec<(i64, String)> {
        let label = |f: &FileRecord| (f.id, f.display_name().to_owned());
        match scope {
            DeleteScope::File(id) => self.find_file(id).map(label).into_iter().collect(),
            DeleteScope::GroupFiles(batch_id) => self
                .bucket(batch_id)
                .map(|b| b.files.iter().map(label).collect())
                .unwrap_or_default(),
            DeleteScope::AllIndividual => self.individual.iter().map(label).collect(),
            DeleteScope::AllGroups => self
                .batches
                .iter()
                .map(|b| (b.batch.id, b.batch.name.clone()))
                .collect(),
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn begin_upload(&mut self) {
        self.busy.uploading = true;
    }

    pub fn begin_delete(&mut self) {
        self.busy.deleting = true;
    }

    pub fn begin_create_group(&mut self) {
        self.busy.creating_group = true;
    }

    /// Starts previewing a file; the caller then fetches sheets and data.
    pub fn begin_preview(&mut self, file_id: i64) -> bool {
        let Some(file) = self.find_file(file_id) else {
            return false;
        };
        self.preview = Some(PreviewState {
            file_id,
            file_name: file.display_name().to_owned(),
            loading: true,
            ..PreviewState::default()
        });
        true
    }

    /// Switches the previewed sheet. Returns `false` when nothing changes.
    pub fn select_sheet(&mut self, sheet: Option<String>) -> bool {
        match &mut self.preview {
            Some(preview) if preview.sheet != sheet => {
                preview.sheet = sheet;
                preview.loading = true;
                true
            }
            _ => false,
        }
    }

    pub fn close_preview(&mut self) {
        self.preview = None;
    }

    fn find_file(&self, file_id: i64) -> Option<&FileRecord> {
        self.individual
            .iter()
            .chain(self.batches.iter().flat_map(|b| b.files.iter()))
            .find(|f| f.id == file_id)
    }

    /// Applies an event. Returns `false` when it belongs to an older
    /// generation and was ignored.
    pub fn apply(&mut self, generation: u64, event: UploadEvent) -> bool {
        if generation != self.generation {
            tracing::debug!(
                stale = generation,
                current = self.generation,
                "Ignoring stale upload response"
            );
            return false;
        }
        match event {
            UploadEvent::Loaded(outcome) => {
                self.busy.loading = false;
                match outcome {
                    Ok((files, batches)) => self.partition(files, batches),
                    Err(e) => self.alert(&e, "Failed to load files"),
                }
            }
            UploadEvent::Uploaded { target, report } => {
                self.busy.uploading = false;
                for file in report.succeeded {
                    self.insert_file(target, file);
                }
                self.alert_failures("upload", &report.failed);
                self.emit_included();
            }
            UploadEvent::UploadRejected(e) => {
                self.busy.uploading = false;
                self.alert(&e, "Upload failed");
            }
            UploadEvent::GroupCreated { flow_id, outcome } => {
                self.busy.creating_group = false;
                if self.flow_id != Some(flow_id) {
                    self.flow_id = Some(flow_id);
                    self.notices.push_back(Notice::FlowSaved(flow_id));
                }
                match outcome {
                    Ok(batch) => {
                        self.target = UploadTarget::Group(batch.id);
                        self.new_group_name.clear();
                        self.batches.push(BatchBucket {
                            batch,
                            files: Vec::new(),
                        });
                    }
                    Err(e) => self.alert(&e, "Failed to create group"),
                }
            }
            UploadEvent::GroupRejected(e) => {
                self.busy.creating_group = false;
                self.alert(&e, "Failed to create group");
            }
            UploadEvent::FilesDeleted(report) => {
                self.busy.deleting = false;
                self.remove_files(&report.succeeded);
                self.alert_failures("delete", &report.failed);
            }
            UploadEvent::GroupsDeleted(report) => {
                self.busy.deleting = false;
                let removed: HashSet<i64> = report.succeeded.iter().copied().collect();
                let file_ids: Vec<i64> = self
                    .batches
                    .iter()
                    .filter(|b| removed.contains(&b.batch.id))
                    .flat_map(|b| b.files.iter().map(|f| f.id))
                    .collect();
                self.batches.retain(|b| !removed.contains(&b.batch.id));
                if let UploadTarget::Group(id) = self.target
                    && removed.contains(&id)
                {
                    self.target = UploadTarget::Individual;
                }
                self.close_preview_on(&file_ids);
                if !removed.is_empty() {
                    self.notices.push_back(Notice::FlowModified);
                    self.emit_included();
                }
                self.alert_failures("delete group", &report.failed);
            }
            UploadEvent::SheetsLoaded { file_id, sheets } => match sheets {
                Ok(sheets) => {
                    if let Some(preview) = self.preview.as_mut().filter(|p| p.file_id == file_id)
                    {
                        preview.sheets = sheets;
                    }
                }
                Err(e) => tracing::warn!(file_id, error = %e, "Could not list sheets"),
            },
            UploadEvent::PreviewLoaded {
                file_id,
                sheet,
                preview,
            } => {
                let Some(state) = self
                    .preview
                    .as_mut()
                    .filter(|p| p.file_id == file_id && p.sheet == sheet)
                else {
                    return true;
                };
                state.loading = false;
                match preview {
                    Ok(data) => state.data = Some(data),
                    Err(e) => self.alert(&e, "Failed to load preview"),
                }
            }
        }
        true
    }

    /// Splits the listing into group buckets and individual files. Files of
    /// groups that belong to other flows are left out.
    fn partition(&mut self, files: Vec<FileRecord>, batches: Vec<BatchRecord>) {
        self.batches = batches
            .into_iter()
            .map(|batch| BatchBucket {
                batch,
                files: Vec::new(),
            })
            .collect();
        self.individual.clear();
        for file in files {
            match file.batch_id {
                None => self.individual.push(file),
                Some(batch_id) => {
                    if let Some(bucket) = self.batches.iter_mut().find(|b| b.batch.id == batch_id)
                    {
                        bucket.files.push(file);
                    }
                }
            }
        }
        tracing::debug!(
            groups = self.batches.len(),
            individual = self.individual.len(),
            "Files partitioned"
        );
        self.emit_included();
    }

    fn insert_file(&mut self, target: UploadTarget, mut file: FileRecord) {
        match target {
            UploadTarget::Individual => {
                file.batch_id = None;
                self.individual.push(file);
            }
            UploadTarget::Group(batch_id) => {
                file.batch_id = Some(batch_id);
                match self.batches.iter_mut().find(|b| b.batch.id == batch_id) {
                    Some(bucket) => {
                        bucket.batch.file_count += 1;
                        bucket.files.push(file);
                    }
                    None => {
                        tracing::debug!(
                            batch_id,
                            file_id = file.id,
                            "Group not listed, keeping file as individual"
                        );
                        file.batch_id = None;
                        self.individual.push(file);
                    }
                }
            }
        }
    }

    fn remove_files(&mut self, ids: &[i64]) {
        if ids.is_empty() {
            return;
        }
        let removed: HashSet<i64> = ids.iter().copied().collect();
        self.individual.retain(|f| !removed.contains(&f.id));
        for bucket in &mut self.batches {
            bucket.files.retain(|f| !removed.contains(&f.id));
            bucket.batch.file_count = bucket.files.len();
        }
        self.close_preview_on(ids);
        self.notices.push_back(Notice::FlowModified);
        self.emit_included();
    }

    fn close_preview_on(&mut self, file_ids: &[i64]) {
        if self
            .preview
            .as_ref()
            .is_some_and(|p| file_ids.contains(&p.file_id))
        {
            self.preview = None;
        }
    }

    /// Queues [`Notice::IncludedFiles`] when the id set changed since the
    /// last emission.
    fn emit_included(&mut self) {
        let ids = self.included_ids();
        if self.last_emitted.as_ref() == Some(&ids) {
            return;
        }
        self.last_emitted = Some(ids.clone());
        self.notices.push_back(Notice::IncludedFiles(ids));
    }

    fn alert(&mut self, error: &SheetpilotError, fallback: &str) {
        tracing::error!(error = %error, "{fallback}");
        self.notices
            .push_back(Notice::Alert(error.user_message(fallback)));
    }

    fn alert_failures(&mut self, action: &str, failed: &[(String, SheetpilotError)]) {
        if failed.is_empty() {
            return;
        }
        for (item, error) in failed {
            tracing::error!(item = %item, error = %error, "Failed to {action}");
        }
        let items: Vec<String> = failed
            .iter()
            .map(|(item, error)| format!("{item}: {}", error.user_message("request failed")))
            .collect();
        self.notices.push_back(Notice::Alert(format!(
            "Failed to {action} {} item(s): {}",
            failed.len(),
            items.join("; ")
        )));
    }
}
