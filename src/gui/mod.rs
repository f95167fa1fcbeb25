//! The desktop flow builder.
//!
//! [`FlowBuilderApp`] owns the [`FlowStore`], the canvas view state and the
//! upload modal state. Every frame it drains the [`Controller`]'s messages,
//! draws the panels and turns what the user did into store commands or
//! background requests.

pub mod controller;
pub mod inspector;
pub mod preview;

use crate::api::{ApiClient, Backend, ExecuteResponse, PreviewTarget, StepPreviewRequest};
use crate::blocks;
use crate::canvas::{DragPayload, FlowCanvas, Viewport};
use crate::config::{ActivityLog, AppSettings};
use crate::error::SheetpilotError;
use crate::model::{FlowRecord, OutputFile, block::palette};
use crate::store::{FlowCommand, FlowStore, GroupFlow};
use crate::targets::{self, PlanOptions};
use crate::theme;
use crate::upload::gui::{UploadRequest, show_upload_modal};
use crate::upload::{Notice, UploadState};
use controller::{AppMessage, Controller};
use eframe::egui;
use egui_phosphor::regular as icons;
use inspector::{InspectorAction, InspectorContext, StepPreview};
use secrecy::SecretString;
use std::sync::Arc;

const VIEWPORT_KEY: &str = "sheetpilot-viewport";

pub struct FlowBuilderApp {
    settings: AppSettings,
    token: Option<SecretString>,
    store: FlowStore,
    canvas: FlowCanvas,
    upload: UploadState,
    /// Upload node whose files the modal is managing
    upload_node: Option<String>,
    controller: Controller,

    flows: Vec<FlowRecord>,
    loading_flows: bool,
    inspecting: Option<String>,
    plan: PlanOptions,
    step_preview: Option<StepPreview>,
    last_run: Option<ExecuteResponse>,
    running: bool,
    exporting: bool,
    outputs: Vec<OutputFile>,

    alert: Option<String>,
    toasts: egui_notify::Toasts,
    activity: ActivityLog,
    show_activity: bool,
    show_settings: bool,
}

impl FlowBuilderApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: AppSettings,
        token: Option<SecretString>,
        api: Arc<dyn Backend>,
    ) -> crate::error::Result<Self> {
        theme::apply_sheetpilot_theme(&cc.egui_ctx);
        let viewport = cc
            .storage
            .and_then(|storage| eframe::get_value::<Viewport>(storage, VIEWPORT_KEY))
            .unwrap_or_default();

        let mut app = Self {
            settings,
            token,
            store: FlowStore::new(),
            canvas: FlowCanvas::new(viewport),
            upload: UploadState::new(),
            upload_node: None,
            controller: Controller::new(api)?,
            flows: Vec::new(),
            loading_flows: false,
            inspecting: None,
            plan: PlanOptions::default(),
            step_preview: None,
            last_run: None,
            running: false,
            exporting: false,
            outputs: Vec::new(),
            alert: None,
            toasts: egui_notify::Toasts::default(),
            activity: ActivityLog::default(),
            show_activity: false,
            show_settings: false,
        };
        app.refresh_flows(&cc.egui_ctx);
        app.refresh_files(&cc.egui_ctx);
        Ok(app)
    }

    fn log_action(&mut self, action: &str, details: &str) {
        tracing::info!(action, details, "User action");
        self.activity.push(action, details);
    }

    fn show_error(&mut self, error: &SheetpilotError, fallback: &str) {
        tracing::warn!(error = %error, "{fallback}");
        self.alert = Some(error.user_message(fallback));
    }

    fn refresh_flows(&mut self, ctx: &egui::Context) {
        self.loading_flows = true;
        self.controller.list_flows(ctx);
    }

    /// Reloads the file listing the inspector offers, scoped to the current
    /// flow.
    fn refresh_files(&mut self, ctx: &egui::Context) {
        let flow_id = self.store.flow_id();
        let generation = self.upload.begin_load(flow_id);
        self.controller.load_files(ctx, generation, flow_id);
    }

    fn open_record(&mut self, ctx: &egui::Context, record: FlowRecord) {
        self.log_action("Flow opened", &record.name);
        self.settings.remember_flow(record.id);
        self.persist_settings();
        self.store = FlowStore::from_record(record);
        self.inspecting = None;
        self.step_preview = None;
        self.last_run = None;
        self.upload.close();
        self.upload_node = None;
        self.refresh_files(ctx);
    }

    fn new_flow(&mut self, ctx: &egui::Context) {
        self.store = FlowStore::new();
        self.inspecting = None;
        self.step_preview = None;
        self.last_run = None;
        self.canvas.viewport.reset();
        self.upload.close();
        self.upload_node = None;
        self.refresh_files(ctx);
        self.log_action("New flow", "");
    }

    fn persist_settings(&self) {
        if let Err(e) = self.settings.save() {
            tracing::warn!(error = %e, "Failed to save settings");
        }
    }

    fn start_save(&mut self, ctx: &egui::Context) {
        if !self.store.save_button().enabled {
            return;
        }
        let snapshot = self.store.begin_save();
        self.controller.save_flow(ctx, snapshot);
    }

    fn handle_messages(&mut self, ctx: &egui::Context) {
        for message in self.controller.drain() {
            match message {
                AppMessage::FlowsListed(outcome) => {
                    self.loading_flows = false;
                    match outcome {
                        Ok(flows) => self.flows = flows,
                        Err(e) => self.show_error(&e, "Failed to load flows"),
                    }
                }
                AppMessage::FlowLoaded(outcome) => match outcome {
                    Ok(record) => self.open_record(ctx, record),
                    Err(e) => self.show_error(&e, "Failed to open flow"),
                },
                AppMessage::FlowSaved { revision, outcome } => {
                    self.store.finish_save(revision, &outcome);
                    match outcome {
                        Ok(record) => {
                            self.upload.set_flow_id(record.id);
                            self.toasts.success(format!("Saved \"{}\"", record.name));
                            self.log_action("Flow saved", &format!("#{} {}", record.id, record.name));
                            self.settings.remember_flow(record.id);
                            self.persist_settings();
                            self.refresh_flows(ctx);
                        }
                        Err(e) => self.show_error(&e, "Failed to save flow"),
                    }
                }
                AppMessage::Upload { generation, event } => {
                    self.upload.apply(generation, event);
                }
                AppMessage::StepPreview { node_id, outcome } => {
                    let Some(preview) = self
                        .step_preview
                        .as_mut()
                        .filter(|p| p.node_id == node_id)
                    else {
                        continue;
                    };
                    preview.loading = false;
                    match outcome {
                        Ok(data) => preview.data = Some(data),
                        Err(e) => {
                            preview.data = None;
                            self.show_error(&e, "Failed to preview step");
                        }
                    }
                }
                AppMessage::Executed(outcome) => {
                    self.running = false;
                    match outcome {
                        Ok(response) => {
                            self.log_action(
                                "Flow executed",
                                &format!("{} rows × {} columns", response.row_count, response.column_count),
                            );
                            self.last_run = Some(response);
                        }
                        Err(e) => self.show_error(&e, "Failed to run flow"),
                    }
                }
                AppMessage::Exported(outcome) => {
                    self.exporting = false;
                    match outcome {
                        Ok(path) => {
                            self.toasts.success(format!("Exported to {}", path.display()));
                            self.log_action("Exported", &path.display().to_string());
                        }
                        Err(e) => self.show_error(&e, "Export failed"),
                    }
                }
                AppMessage::Precomputed(outcome) => match outcome {
                    Ok(response) => {
                        self.toasts.info(format!(
                            "Precompute {}: {} steps cached",
                            response.status, response.precomputed
                        ));
                    }
                    Err(e) => self.show_error(&e, "Precompute failed"),
                },
                AppMessage::OutputsListed(outcome) => match outcome {
                    Ok(listing) => self.outputs = listing.outputs,
                    Err(e) => self.show_error(&e, "Failed to list outputs"),
                },
            }
        }
        self.handle_upload_notices();
    }

    fn handle_upload_notices(&mut self) {
        for notice in self.upload.drain_notices() {
            match notice {
                Notice::IncludedFiles(file_ids) => {
                    let Some(node_id) = self.upload_node.clone() else {
                        continue;
                    };
                    let count = file_ids.len();
                    self.store.dispatch(FlowCommand::SetFileIds {
                        id: node_id,
                        file_ids,
                        batch_ids: self.upload.group_ids(),
                    });
                    tracing::debug!(count, "Upload block files updated");
                }
                Notice::FlowModified => {
                    self.toasts.info("Files changed. Update the flow to keep it in sync.");
                    self.log_action("Files deleted", "");
                }
                Notice::FlowSaved(flow_id) => {
                    self.settings.remember_flow(flow_id);
                }
                Notice::Alert(message) => self.alert = Some(message),
            }
        }
    }

    fn handle_upload_requests(&mut self, ctx: &egui::Context, requests: Vec<UploadRequest>) {
        let generation = self.upload.generation();
        for request in requests {
            match request {
                UploadRequest::Upload(files) => {
                    let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
                    self.activity.push("Upload", names.join(", "));
                    self.upload.begin_upload();
                    self.controller
                        .upload_files(ctx, generation, files, self.upload.target);
                }
                UploadRequest::CreateGroup(name) => {
                    let (flow_id, pending_save) = match self.store.flow_for_group() {
                        GroupFlow::Saved(id) => (Some(id), None),
                        GroupFlow::SaveFirst(snapshot) => (None, Some(snapshot)),
                        GroupFlow::SaveInFlight => {
                            self.alert = Some(
                                "The flow is still being saved. Create the group once it finishes."
                                    .to_owned(),
                            );
                            continue;
                        }
                    };
                    self.upload.begin_create_group();
                    self.controller
                        .create_group(ctx, generation, name, flow_id, pending_save);
                }
                UploadRequest::Delete(scope) => {
                    let items = self.upload.delete_candidates(scope);
                    if items.is_empty() {
                        continue;
                    }
                    self.upload.begin_delete();
                    self.controller.delete(ctx, generation, scope, items);
                }
                UploadRequest::Preview(file_id) => {
                    if self.upload.begin_preview(file_id) {
                        self.controller
                            .preview_file(ctx, generation, file_id, None, true);
                    }
                }
                UploadRequest::SelectSheet(sheet) => {
                    let Some(file_id) = self.upload.preview().map(|p| p.file_id) else {
                        continue;
                    };
                    if self.upload.select_sheet(sheet.clone()) {
                        self.controller
                            .preview_file(ctx, generation, file_id, sheet, false);
                    }
                }
                UploadRequest::Close => {
                    self.upload.close();
                    self.upload_node = None;
                    self.refresh_files(ctx);
                }
            }
        }
    }

    fn handle_inspector_action(&mut self, ctx: &egui::Context, action: InspectorAction) {
        match action {
            InspectorAction::Close => {
                self.inspecting = None;
            }
            InspectorAction::ManageFiles(node_id) => {
                self.upload_node = Some(node_id);
                let flow_id = self.store.flow_id();
                let generation = self.upload.open(flow_id);
                self.controller.load_files(ctx, generation, flow_id);
            }
            InspectorAction::PreviewStep(node_id) => self.preview_step(ctx, node_id),
            InspectorAction::Retarget { node_id, mode } => {
                let files = self.upload.all_files();
                match targets::retarget(&self.store, &node_id, mode, &files, &self.plan) {
                    Ok(commands) => {
                        for command in commands {
                            self.store.dispatch(command);
                        }
                        self.log_action("Targets updated", mode.label());
                    }
                    Err(e) => self.show_error(&e, "Could not plan targets"),
                }
            }
            InspectorAction::RunPreview(target) => self.run(ctx, Some(target)),
        }
    }

    fn preview_step(&mut self, ctx: &egui::Context, node_id: String) {
        let Some(block) = self.store.node(&node_id).map(|n| n.data.block.clone()) else {
            return;
        };
        if let Err(e) = block.validate() {
            self.show_error(&e, "Invalid configuration");
            return;
        }
        let Some(file_id) = self.store.flow_data().referenced_file_ids().first().copied() else {
            self.alert = Some("Add files to an upload block before previewing a step.".to_owned());
            return;
        };
        let request = match StepPreviewRequest::for_block(file_id, &block) {
            Ok(request) => request,
            Err(e) => {
                self.show_error(&e, "Could not encode the step");
                return;
            }
        };
        self.step_preview = Some(StepPreview {
            node_id: node_id.clone(),
            loading: true,
            data: None,
        });
        self.controller.preview_step(ctx, node_id, request);
    }

    fn run(&mut self, ctx: &egui::Context, target: Option<PreviewTarget>) {
        if self.running {
            return;
        }
        let flow_data = self.store.flow_data();
        if let Some(e) = flow_data
            .nodes
            .iter()
            .find_map(|n| n.data.block.validate().err())
        {
            self.show_error(&e, "Invalid configuration");
            return;
        }
        self.running = true;
        self.controller.execute(ctx, flow_data, target);
    }

    fn export(&mut self, ctx: &egui::Context) {
        if self.exporting {
            return;
        }
        self.exporting = true;
        let dir = self.settings.resolved_download_dir();
        self.log_action("Export started", &dir.display().to_string());
        self.controller.export(ctx, self.store.flow_data(), dir);
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar")
            .frame(theme::top_bar_frame())
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading(format!("{} SheetPilot", icons::FLOW_ARROW));
                    ui.separator();

                    let mut name = self.store.name().to_owned();
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut name)
                            .hint_text("Flow name")
                            .desired_width(220.0),
                    );
                    if response.changed() {
                        self.store.dispatch(FlowCommand::Rename(name));
                    }

                    let save = self.store.save_button();
                    if ui
                        .add_enabled(save.enabled, egui::Button::new(format!("{} {}", icons::FLOPPY_DISK, save.label)))
                        .clicked()
                    {
                        self.start_save(ctx);
                    }
                    if ui.button(format!("{} New", icons::FILE_PLUS)).clicked() {
                        self.new_flow(ctx);
                    }

                    ui.separator();
                    if ui
                        .add_enabled(!self.running, egui::Button::new(format!("{} Run", icons::PLAY)))
                        .clicked()
                    {
                        self.run(ctx, None);
                    }
                    if self.running {
                        ui.spinner();
                    }
                    if ui
                        .add_enabled(!self.exporting, egui::Button::new(format!("{} Export", icons::DOWNLOAD_SIMPLE)))
                        .on_hover_text(format!(
                            "Downloads {}",
                            crate::export::expected_download_name(&crate::export::output_config_of(
                                &self.store.flow_data()
                            ))
                        ))
                        .clicked()
                    {
                        self.export(ctx);
                    }
                    if self.exporting {
                        ui.spinner();
                    }
                    ui.menu_button(format!("{} More", icons::DOTS_THREE), |ui| {
                        if ui.button("Precompute").clicked() {
                            self.controller.precompute(ctx, self.store.flow_data());
                            ui.close();
                        }
                        if ui.button("List outputs").clicked() {
                            self.controller.list_outputs(ctx);
                            ui.close();
                        }
                        if ui.button("Reset view").clicked() {
                            self.canvas.viewport.reset();
                            ui.close();
                        }
                    });

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button(icons::GEAR).on_hover_text("Settings").clicked() {
                            self.show_settings = !self.show_settings;
                        }
                        ui.toggle_value(&mut self.show_activity, icons::LIST_BULLETS)
                            .on_hover_text("Activity");
                        egui::widgets::global_theme_preference_switch(ui);
                        ui.label(
                            egui::RichText::new(format!("{:.0}%", self.canvas.viewport.zoom * 100.0))
                                .weak(),
                        );
                    });
                });
            });
    }

    fn render_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("palette")
            .resizable(true)
            .default_width(220.0)
            .frame(theme::sidebar_frame())
            .show(ctx, |ui| {
                ui.heading("Blocks");
                ui.label(egui::RichText::new("Drag onto the canvas").weak());
                ui.add_space(theme::SPACING_SMALL);
                for template in palette() {
                    let payload = match DragPayload::for_template(&template) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::warn!(template = %template.id, error = %e, "Skipping palette entry");
                            continue;
                        }
                    };
                    let id = egui::Id::new(("palette", &template.id));
                    ui.dnd_drag_source(id, payload, |ui| {
                        theme::card_frame(ui).show(ui, |ui| {
                            ui.set_width(ui.available_width());
                            ui.horizontal(|ui| {
                                ui.colored_label(
                                    theme::block_color(template.kind),
                                    blocks::icon(template.kind),
                                );
                                ui.label(&template.label);
                            });
                        });
                    });
                    ui.add_space(theme::SPACING_TINY);
                }

                ui.separator();
                ui.horizontal(|ui| {
                    ui.heading("Flows");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add_enabled(!self.loading_flows, egui::Button::new(icons::ARROWS_CLOCKWISE).small())
                            .clicked()
                        {
                            self.refresh_flows(ctx);
                        }
                        if self.loading_flows {
                            ui.spinner();
                        }
                    });
                });
                egui::ScrollArea::vertical().id_salt("flows").show(ui, |ui| {
                    let current = self.store.flow_id();
                    let mut open = None;
                    for flow in &self.flows {
                        let recent = self.settings.recent_flow_ids.contains(&flow.id);
                        let label = if recent {
                            format!("{} {}", icons::CLOCK, flow.name)
                        } else {
                            flow.name.clone()
                        };
                        if ui
                            .selectable_label(current == Some(flow.id), label)
                            .on_hover_text(format!(
                                "Updated {}",
                                crate::utils::fmt_timestamp(flow.updated_at.as_deref())
                            ))
                            .clicked()
                        {
                            open = Some(flow.id);
                        }
                    }
                    if let Some(id) = open {
                        self.controller.load_flow(ctx, id);
                    }
                });
            });
    }

    fn render_inspector(&mut self, ctx: &egui::Context) {
        let Some(node_id) = self.inspecting.clone() else {
            return;
        };
        let files = self.upload.all_files();
        let mut action = None;
        egui::SidePanel::right("inspector")
            .resizable(true)
            .default_width(340.0)
            .frame(theme::sidebar_frame())
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let context = InspectorContext {
                        files: &files,
                        groups: self.upload.batches(),
                        step_preview: self.step_preview.as_ref(),
                        row_limit: self.settings.preview_row_limit,
                    };
                    action = inspector::show_inspector(
                        ui,
                        &mut self.store,
                        &node_id,
                        &context,
                        &mut self.plan,
                    );
                });
            });
        if let Some(action) = action {
            self.handle_inspector_action(ctx, action);
        }
    }

    fn render_results(&mut self, ctx: &egui::Context) {
        if self.last_run.is_none() && self.outputs.is_empty() && !self.show_activity {
            return;
        }
        egui::TopBottomPanel::bottom("results")
            .resizable(true)
            .default_height(220.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Results");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button(icons::X).clicked() {
                            self.last_run = None;
                            self.outputs.clear();
                            self.show_activity = false;
                        }
                    });
                });
                if !self.outputs.is_empty() {
                    ui.horizontal_wrapped(|ui| {
                        for output in &self.outputs {
                            let sheets: Vec<&str> =
                                output.sheets.iter().map(|s| s.sheet_name.as_str()).collect();
                            ui.label(format!("{} {} [{}]", icons::FILE_XLS, output.file_name, sheets.join(", ")));
                        }
                    });
                }
                if let Some(run) = &self.last_run {
                    preview::render_preview_table(ui, "run-preview", &run.preview, self.settings.preview_row_limit);
                }
                if self.show_activity {
                    ui.separator();
                    self.render_activity(ui);
                }
            });
    }

    fn render_activity(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.strong("Activity");
            if ui.small_button(format!("{} Clear", icons::TRASH)).clicked() {
                self.activity.clear();
            }
        });
        egui::ScrollArea::vertical()
            .id_salt("activity")
            .stick_to_bottom(true)
            .show(ui, |ui| {
                egui::Grid::new("activity_grid")
                    .num_columns(3)
                    .spacing([15.0, 4.0])
                    .striped(true)
                    .show(ui, |ui| {
                        for entry in self.activity.entries() {
                            ui.label(
                                entry
                                    .timestamp
                                    .with_timezone(&chrono::Local)
                                    .format("%H:%M:%S")
                                    .to_string(),
                            );
                            ui.label(egui::RichText::new(&entry.action).strong());
                            ui.label(&entry.details);
                            ui.end_row();
                        }
                    });
            });
    }

    fn render_settings(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }
        let mut open = true;
        let mut apply = false;
        egui::Window::new(format!("{} Settings", icons::GEAR))
            .collapsible(false)
            .open(&mut open)
            .show(ctx, |ui| {
                egui::Grid::new("settings_grid")
                    .num_columns(2)
                    .spacing([12.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("API URL");
                        ui.text_edit_singleline(&mut self.settings.api_base_url);
                        ui.end_row();

                        ui.label("Preview rows");
                        ui.add(egui::DragValue::new(&mut self.settings.preview_row_limit).range(10..=1000));
                        ui.end_row();

                        ui.label("Download folder");
                        ui.horizontal(|ui| {
                            ui.label(self.settings.resolved_download_dir().display().to_string());
                            if ui.small_button(icons::FOLDER_OPEN).clicked()
                                && let Some(dir) = rfd::FileDialog::new().pick_folder()
                            {
                                self.settings.download_dir = Some(dir);
                            }
                        });
                        ui.end_row();
                    });
                ui.add_space(theme::SPACING_SMALL);
                apply = ui.button("Apply").clicked();
            });
        if apply {
            self.apply_settings(ctx);
        }
        if !open {
            self.show_settings = false;
        }
    }

    fn apply_settings(&mut self, ctx: &egui::Context) {
        self.persist_settings();
        match ApiClient::new(&self.settings.api_base_url, self.token.clone()) {
            Ok(client) => {
                self.controller.set_api(Arc::new(client));
                self.log_action("Settings applied", &self.settings.api_base_url.clone());
                self.refresh_flows(ctx);
                self.refresh_files(ctx);
            }
            Err(e) => self.show_error(&e, "Invalid API settings"),
        }
    }

    fn render_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alert.clone() else {
            return;
        };
        let response = egui::Modal::new(egui::Id::new("alert")).show(ctx, |ui| {
            ui.set_max_width(420.0);
            ui.heading(format!("{} Something went wrong", icons::WARNING));
            ui.add_space(theme::SPACING_SMALL);
            ui.label(message);
            ui.add_space(theme::SPACING_MEDIUM);
            ui.button("OK").clicked()
        });
        if response.inner || response.should_close() {
            self.alert = None;
        }
    }
}

impl eframe::App for FlowBuilderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_messages(ctx);

        let save_shortcut = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S);
        if ctx.input_mut(|i| i.consume_shortcut(&save_shortcut)) {
            self.start_save(ctx);
        }

        self.render_top_bar(ctx);
        self.render_sidebar(ctx);
        self.render_inspector(ctx);
        self.render_results(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(ctx.style().visuals.extreme_bg_color))
            .show(ctx, |ui| {
                let response = self.canvas.show(ui, &mut self.store);
                if let Some(created) = &response.created {
                    self.log_action("Block added", created);
                }
                if let Some(opened) = response.opened {
                    self.inspecting = Some(opened);
                }
            });

        let requests = show_upload_modal(ctx, &mut self.upload, self.settings.preview_row_limit);
        if !requests.is_empty() {
            self.handle_upload_requests(ctx, requests);
        }
        self.handle_upload_notices();

        self.render_settings(ctx);
        self.render_alert(ctx);
        self.toasts.show(ctx);
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, VIEWPORT_KEY, &self.canvas.viewport);
    }
}
