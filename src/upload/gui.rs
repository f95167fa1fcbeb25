//! The upload modal window.
//!
//! Rendering only: the window reads [`UploadState`] and reports what the
//! user asked for as [`UploadRequest`]s, which the app turns into
//! background calls.

use super::state::{DeleteScope, UploadState, UploadTarget};
use super::validation::ALLOWED_EXTENSIONS;
use crate::api::FileUpload;
use crate::model::FileRecord;
use crate::theme;
use crate::utils::fmt_file_size;
use eframe::egui;
use egui_phosphor::regular as icons;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRequest {
    /// Upload to the currently selected target
    Upload(Vec<FileUpload>),
    CreateGroup(String),
    Delete(DeleteScope),
    Preview(i64),
    SelectSheet(Option<String>),
    Close,
}

/// Converts a file dropped onto the window. Files without content or a
/// readable path are skipped.
pub fn upload_from_dropped(file: &egui::DroppedFile) -> Option<FileUpload> {
    if let Some(bytes) = &file.bytes {
        let file_name = if file.name.is_empty() {
            file.path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_owned())
        } else {
            file.name.clone()
        };
        return Some(FileUpload {
            file_name,
            mime_type: (!file.mime.is_empty()).then(|| file.mime.clone()),
            bytes: bytes.to_vec(),
        });
    }
    let path = file.path.as_ref()?;
    match FileUpload::from_path(path) {
        Ok(upload) => Some(upload),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not read dropped file");
            None
        }
    }
}

/// Opens the native picker for spreadsheets.
pub fn pick_uploads() -> Vec<FileUpload> {
    let Some(paths) = rfd::FileDialog::new()
        .add_filter("Spreadsheets", &ALLOWED_EXTENSIONS)
        .pick_files()
    else {
        return Vec::new();
    };
    paths
        .iter()
        .filter_map(|path| match FileUpload::from_path(path) {
            Ok(upload) => Some(upload),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read picked file");
                None
            }
        })
        .collect()
}

fn target_label(state: &UploadState, target: UploadTarget) -> String {
    match target {
        UploadTarget::Individual => "Individual files".to_owned(),
        UploadTarget::Group(id) => state
            .bucket(id)
            .map_or_else(|| format!("Group #{id}"), |b| b.batch.name.clone()),
    }
}

fn file_row(ui: &mut egui::Ui, file: &FileRecord, busy: bool, requests: &mut Vec<UploadRequest>) {
    ui.horizontal(|ui| {
        ui.label(icons::FILE);
        ui.label(file.display_name());
        ui.label(egui::RichText::new(fmt_file_size(file.file_size)).weak());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .add_enabled(!busy, egui::Button::new(icons::TRASH).small())
                .on_hover_text("Delete file")
                .clicked()
            {
                requests.push(UploadRequest::Delete(DeleteScope::File(file.id)));
            }
            if ui
                .small_button(icons::EYE)
                .on_hover_text("Preview")
                .clicked()
            {
                requests.push(UploadRequest::Preview(file.id));
            }
        });
    });
}

fn render_dropzone(ui: &mut egui::Ui, state: &UploadState, requests: &mut Vec<UploadRequest>) {
    let uploading = state.busy().uploading;
    theme::card_frame(ui).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.vertical_centered(|ui| {
            if uploading {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Uploading…");
                });
                return;
            }
            ui.label(egui::RichText::new(icons::UPLOAD_SIMPLE).size(28.0));
            ui.label("Drop .xlsx, .xls or .csv files here");
            if ui.button(format!("{} Browse…", icons::FOLDER_OPEN)).clicked() {
                let picked = pick_uploads();
                if !picked.is_empty() {
                    requests.push(UploadRequest::Upload(picked));
                }
            }
        });
    });

    if !uploading {
        let dropped: Vec<FileUpload> = ui.ctx().input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(upload_from_dropped)
                .collect()
        });
        if !dropped.is_empty() {
            requests.push(UploadRequest::Upload(dropped));
        }
    }
}

fn render_groups(ui: &mut egui::Ui, state: &mut UploadState, requests: &mut Vec<UploadRequest>) {
    let busy = state.busy();
    ui.horizontal(|ui| {
        ui.heading("Groups");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .add_enabled(
                    !busy.deleting && !state.batches().is_empty(),
                    egui::Button::new(format!("{} Delete all groups", icons::TRASH)),
                )
                .clicked()
            {
                requests.push(UploadRequest::Delete(DeleteScope::AllGroups));
            }
        });
    });
    ui.horizontal(|ui| {
        ui.add(
            egui::TextEdit::singleline(&mut state.new_group_name)
                .hint_text("New group name")
                .desired_width(220.0),
        );
        let can_create = !busy.creating_group && !state.new_group_name.trim().is_empty();
        if ui
            .add_enabled(can_create, egui::Button::new(format!("{} Create group", icons::PLUS)))
            .clicked()
        {
            requests.push(UploadRequest::CreateGroup(state.new_group_name.clone()));
        }
        if busy.creating_group {
            ui.spinner();
        }
    });

    if state.batches().is_empty() {
        ui.label(egui::RichText::new("No groups yet").weak());
    }
    for bucket in state.batches() {
        let title = format!("{} ({} files)", bucket.batch.name, bucket.files.len());
        egui::CollapsingHeader::new(title)
            .id_salt(("upload-group", bucket.batch.id))
            .default_open(true)
            .show(ui, |ui| {
                for file in &bucket.files {
                    file_row(ui, file, busy.deleting, requests);
                }
                if ui
                    .add_enabled(
                        !busy.deleting && !bucket.files.is_empty(),
                        egui::Button::new("Delete all files in group").small(),
                    )
                    .clicked()
                {
                    requests.push(UploadRequest::Delete(DeleteScope::GroupFiles(
                        bucket.batch.id,
                    )));
                }
            });
    }
}

fn render_individual(ui: &mut egui::Ui, state: &UploadState, requests: &mut Vec<UploadRequest>) {
    let busy = state.busy();
    ui.horizontal(|ui| {
        ui.heading("Individual files");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .add_enabled(
                    !busy.deleting && !state.individual().is_empty(),
                    egui::Button::new(format!("{} Delete all", icons::TRASH)),
                )
                .clicked()
            {
                requests.push(UploadRequest::Delete(DeleteScope::AllIndividual));
            }
        });
    });
    if state.individual().is_empty() {
        ui.label(egui::RichText::new("No individual files").weak());
    }
    for file in state.individual() {
        file_row(ui, file, busy.deleting, requests);
    }
}

fn render_file_preview(
    ui: &mut egui::Ui,
    state: &mut UploadState,
    row_limit: usize,
    requests: &mut Vec<UploadRequest>,
) {
    let Some(preview) = state.preview().cloned() else {
        return;
    };
    ui.separator();
    let mut close = false;
    ui.horizontal(|ui| {
        ui.strong(format!("{} {}", icons::EYE, preview.file_name));
        if !preview.sheets.is_empty() {
            let current = preview.sheet.clone().unwrap_or_else(|| "First sheet".to_owned());
            egui::ComboBox::from_id_salt("upload-preview-sheet")
                .selected_text(current)
                .show_ui(ui, |ui| {
                    for sheet in &preview.sheets {
                        let selected = preview.sheet.as_deref() == Some(sheet.as_str());
                        if ui.selectable_label(selected, sheet).clicked() && !selected {
                            requests.push(UploadRequest::SelectSheet(Some(sheet.clone())));
                        }
                    }
                });
        }
        if preview.loading {
            ui.spinner();
        }
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            close = ui.small_button(icons::X).clicked();
        });
    });
    if close {
        state.close_preview();
        return;
    }
    if let Some(data) = &preview.data {
        crate::gui::preview::render_preview_table(ui, "upload-preview", data, row_limit);
    }
}

/// Draws the modal and returns what the user asked for this frame.
pub fn show_upload_modal(
    ctx: &egui::Context,
    state: &mut UploadState,
    row_limit: usize,
) -> Vec<UploadRequest> {
    let mut requests = Vec::new();
    if !state.is_open() {
        return requests;
    }
    let mut open = true;
    egui::Window::new(format!("{} Data files", icons::DATABASE))
        .collapsible(false)
        .resizable(true)
        .default_width(720.0)
        .open(&mut open)
        .show(ctx, |ui| {
            if state.busy().loading {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading files…");
                });
                return;
            }

            ui.horizontal(|ui| {
                ui.label("Upload to:");
                let current = target_label(state, state.target);
                let mut target = state.target;
                egui::ComboBox::from_id_salt("upload-target")
                    .selected_text(current)
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut target, UploadTarget::Individual, "Individual files");
                        for bucket in state.batches() {
                            ui.selectable_value(
                                &mut target,
                                UploadTarget::Group(bucket.batch.id),
                                &bucket.batch.name,
                            );
                        }
                    });
                state.target = target;
            });
            render_dropzone(ui, state, &mut requests);
            ui.add_space(theme::SPACING_SMALL);

            egui::ScrollArea::vertical()
                .max_height(320.0)
                .show(ui, |ui| {
                    render_groups(ui, state, &mut requests);
                    ui.add_space(theme::SPACING_MEDIUM);
                    render_individual(ui, state, &mut requests);
                });

            render_file_preview(ui, state, row_limit, &mut requests);
        });
    if !open {
        requests.push(UploadRequest::Close);
    }
    requests
}
