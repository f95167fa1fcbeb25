//! Side panel that edits the configuration of one node.

use crate::api::PreviewTarget;
use crate::blocks;
use crate::model::{
    BlockConfig, FilePreview, FileRecord, FilterConfig, FilterOperator, TargetMode,
    TransformConfig, TransformOperation,
};
use crate::store::{FlowCommand, FlowStore};
use crate::targets::PlanOptions;
use crate::upload::BatchBucket;
use eframe::egui;
use egui_phosphor::regular as icons;
use std::collections::BTreeMap;

/// Requests the inspector cannot satisfy by editing the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectorAction {
    Close,
    ManageFiles(String),
    PreviewStep(String),
    Retarget { node_id: String, mode: TargetMode },
    RunPreview(PreviewTarget),
}

/// Result of the last "preview this step" request.
#[derive(Debug, Default)]
pub struct StepPreview {
    pub node_id: String,
    pub loading: bool,
    pub data: Option<FilePreview>,
}

/// Read-only data the inspector needs besides the node itself.
pub struct InspectorContext<'a> {
    pub files: &'a [FileRecord],
    pub groups: &'a [BatchBucket],
    pub step_preview: Option<&'a StepPreview>,
    pub row_limit: usize,
}

/// Splits a comma separated column list, dropping blanks.
pub fn parse_column_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses `old:new` pairs separated by commas. Pairs without a new name are
/// skipped.
pub fn parse_mapping(text: &str) -> BTreeMap<String, String> {
    text.split(',')
        .filter_map(|pair| {
            let (from, to) = pair.split_once(':')?;
            let (from, to) = (from.trim(), to.trim());
            (!from.is_empty() && !to.is_empty()).then(|| (from.to_owned(), to.to_owned()))
        })
        .collect()
}

pub fn format_mapping(mapping: &BTreeMap<String, String>) -> String {
    mapping
        .iter()
        .map(|(from, to)| format!("{from}: {to}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single-line editor whose text lives in egui memory, so partially typed
/// input survives until it parses. Returns the text when it changed.
fn buffered_text(ui: &mut egui::Ui, id: egui::Id, hint: &str, initial: impl FnOnce() -> String) -> Option<String> {
    let mut text = ui
        .data_mut(|d| d.get_temp::<String>(id))
        .unwrap_or_else(initial);
    let changed = ui
        .add(
            egui::TextEdit::singleline(&mut text)
                .hint_text(hint)
                .desired_width(f32::INFINITY),
        )
        .changed();
    ui.data_mut(|d| d.insert_temp(id, text.clone()));
    changed.then_some(text)
}

fn filter_editor(ui: &mut egui::Ui, id_salt: &str, filter: &mut FilterConfig) {
    egui::Grid::new(("filter-grid", id_salt))
        .num_columns(2)
        .spacing([8.0, 6.0])
        .show(ui, |ui| {
            ui.label("Column");
            ui.text_edit_singleline(&mut filter.column);
            ui.end_row();

            ui.label("Operator");
            egui::ComboBox::from_id_salt(("filter-op", id_salt))
                .selected_text(filter.operator.label())
                .show_ui(ui, |ui| {
                    for op in FilterOperator::ALL {
                        ui.selectable_value(&mut filter.operator, op, op.label());
                    }
                });
            ui.end_row();

            if filter.operator.needs_value() {
                ui.label("Value");
                let mut value = filter.value.clone().unwrap_or_default();
                if ui.text_edit_singleline(&mut value).changed() {
                    filter.value = (!value.is_empty()).then_some(value);
                }
                ui.end_row();
            } else {
                filter.value = None;
            }
        });
}

fn operation_editor(ui: &mut egui::Ui, node_id: &str, files: &[FileRecord], op: &mut TransformOperation) {
    let buffer_id = egui::Id::new(("operation-text", node_id));
    match op {
        TransformOperation::SortRows { columns, ascending } => {
            ui.label("Sort columns, in priority order");
            if let Some(text) = buffered_text(ui, buffer_id, "region, total", || columns.join(", ")) {
                *columns = parse_column_list(&text);
            }
            ui.checkbox(ascending, "Ascending");
        }
        TransformOperation::RenameColumns { mapping } => {
            ui.label("Renames");
            if let Some(text) = buffered_text(ui, buffer_id, "old: new, other: renamed", || {
                format_mapping(mapping)
            }) {
                *mapping = parse_mapping(&text);
            }
        }
        TransformOperation::RearrangeColumns { order } => {
            ui.label("Column order");
            if let Some(text) = buffered_text(ui, buffer_id, "first, second, third", || order.join(", ")) {
                *order = parse_column_list(&text);
            }
        }
        TransformOperation::RemoveDuplicates { columns } => {
            ui.label("Compare columns (empty compares whole rows)");
            if let Some(text) = buffered_text(ui, buffer_id, "id, email", || columns.join(", ")) {
                *columns = parse_column_list(&text);
            }
        }
        TransformOperation::RemoveColumns { columns } => {
            ui.label("Columns to remove");
            if let Some(text) = buffered_text(ui, buffer_id, "notes, internal_id", || columns.join(", ")) {
                *columns = parse_column_list(&text);
            }
        }
        TransformOperation::DeleteRows { filter } => {
            ui.label("Delete rows where");
            filter_editor(ui, node_id, filter);
        }
        TransformOperation::JoinLookup {
            lookup_file_id,
            left_key,
            right_key,
        } => {
            let selected = lookup_file_id
                .and_then(|id| files.iter().find(|f| f.id == id))
                .map_or("Choose a file", |f| f.display_name());
            egui::ComboBox::from_id_salt(("lookup-file", node_id))
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    for file in files {
                        ui.selectable_value(lookup_file_id, Some(file.id), file.display_name());
                    }
                });
            egui::Grid::new(("join-keys", node_id))
                .num_columns(2)
                .show(ui, |ui| {
                    ui.label("Left key");
                    ui.text_edit_singleline(left_key);
                    ui.end_row();
                    ui.label("Right key");
                    ui.text_edit_singleline(right_key);
                    ui.end_row();
                });
        }
        TransformOperation::AppendFiles => {
            ui.label("Appends every source file into one table.");
        }
    }
}

fn targets_editor(
    ui: &mut egui::Ui,
    node_id: &str,
    config: &TransformConfig,
    groups: &[BatchBucket],
    plan: &mut PlanOptions,
    action: &mut Option<InspectorAction>,
) {
    ui.separator();
    ui.strong("Destination targets");
    let mut mode = config.mode;
    egui::ComboBox::from_id_salt(("target-mode", node_id))
        .selected_text(mode.label())
        .show_ui(ui, |ui| {
            for candidate in TargetMode::ALL {
                ui.selectable_value(&mut mode, candidate, candidate.label());
            }
        });

    if mode.uses_groups() {
        let selected = plan
            .group_id
            .and_then(|id| groups.iter().find(|g| g.batch.id == id))
            .map_or("All groups", |g| g.batch.name.as_str());
        egui::ComboBox::from_id_salt(("target-group", node_id))
            .selected_text(selected)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut plan.group_id, None, "All groups");
                for group in groups {
                    ui.selectable_value(&mut plan.group_id, Some(group.batch.id), &group.batch.name);
                }
            });
    }
    if mode.merges() {
        let mut name = plan.merged_name.clone().unwrap_or_default();
        ui.horizontal(|ui| {
            ui.label("Output file");
            if ui
                .add(egui::TextEdit::singleline(&mut name).hint_text(crate::targets::DEFAULT_MERGED_NAME))
                .changed()
            {
                plan.merged_name = (!name.trim().is_empty()).then_some(name);
            }
        });
    }

    if mode != config.mode || ui.button(format!("{} Apply targets", icons::ARROWS_CLOCKWISE)).clicked() {
        *action = Some(InspectorAction::Retarget {
            node_id: node_id.to_owned(),
            mode,
        });
    }

    for target in &config.targets {
        ui.horizontal(|ui| {
            ui.label(format!("{} / {}", target.file_name, target.sheet_name));
            if let Some(batch) = target.batch_id {
                ui.label(egui::RichText::new(format!("group #{batch}")).weak());
            }
            if ui.small_button(icons::EYE).on_hover_text("Preview output").clicked() {
                *action = Some(InspectorAction::RunPreview(PreviewTarget::Virtual {
                    virtual_id: target.virtual_id.clone(),
                }));
            }
        });
    }
}

fn upload_details(
    ui: &mut egui::Ui,
    node_id: &str,
    file_ids: &[i64],
    files: &[FileRecord],
    action: &mut Option<InspectorAction>,
) {
    if ui.button(format!("{} Manage files…", icons::FOLDER_OPEN)).clicked() {
        *action = Some(InspectorAction::ManageFiles(node_id.to_owned()));
    }
    if file_ids.is_empty() {
        ui.label(egui::RichText::new("No files yet").weak());
    }
    for id in file_ids {
        let name = files
            .iter()
            .find(|f| f.id == *id)
            .map_or_else(|| format!("File #{id}"), |f| f.display_name().to_owned());
        ui.horizontal(|ui| {
            ui.label(icons::FILE);
            ui.label(name);
            if ui.small_button(icons::EYE).on_hover_text("Preview through the flow").clicked() {
                *action = Some(InspectorAction::RunPreview(PreviewTarget::File {
                    file_id: *id,
                    sheet_name: None,
                }));
            }
        });
    }
}

/// Draws the editor for `node_id`, dispatching edits to the store as they
/// happen.
pub fn show_inspector(
    ui: &mut egui::Ui,
    store: &mut FlowStore,
    node_id: &str,
    context: &InspectorContext<'_>,
    plan: &mut PlanOptions,
) -> Option<InspectorAction> {
    let mut action = None;
    let Some(node) = store.node(node_id).cloned() else {
        return Some(InspectorAction::Close);
    };

    ui.horizontal(|ui| {
        ui.heading(format!("{} {}", blocks::icon(node.kind), node.kind));
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.small_button(icons::X).clicked() {
                action = Some(InspectorAction::Close);
            }
        });
    });
    ui.separator();

    let mut label = node.data.label.clone();
    ui.horizontal(|ui| {
        ui.label("Label");
        if ui.text_edit_singleline(&mut label).changed() {
            store.dispatch(FlowCommand::Relabel {
                id: node.id.clone(),
                label,
            });
        }
    });
    ui.add_space(crate::theme::SPACING_SMALL);

    let mut block = node.data.block.clone();
    match &mut block {
        BlockConfig::Source => {
            ui.label("Start of flow. Connect upload blocks below it.");
        }
        BlockConfig::Upload { file_ids, .. } => {
            upload_details(ui, &node.id, file_ids, context.files, &mut action);
        }
        BlockConfig::Filter { config } => {
            filter_editor(ui, &node.id, config);
        }
        BlockConfig::Transform { config } => {
            ui.strong(config.operation.name());
            operation_editor(ui, &node.id, context.files, &mut config.operation);
            targets_editor(ui, &node.id, config, context.groups, plan, &mut action);
        }
        BlockConfig::Output { output } => {
            if output.outputs.is_empty() {
                ui.label(egui::RichText::new("Set targets on a transform to fill this output").weak());
            }
            for file in &output.outputs {
                ui.strong(format!("{} {}", icons::FILE_XLS, file.file_name));
                for sheet in &file.sheets {
                    ui.label(format!("   {}", sheet.sheet_name));
                }
            }
        }
    }

    if let Err(e) = block.validate() {
        ui.colored_label(ui.visuals().warn_fg_color, e.user_message("Invalid configuration"));
    }
    if block != node.data.block {
        store.dispatch(FlowCommand::UpdateConfig {
            id: node.id.clone(),
            config: block,
        });
    }

    if matches!(node.data.block, BlockConfig::Filter { .. } | BlockConfig::Transform { .. }) {
        ui.separator();
        let loading = context
            .step_preview
            .is_some_and(|p| p.node_id == node.id && p.loading);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!loading, egui::Button::new(format!("{} Preview this step", icons::EYE)))
                .clicked()
            {
                action = Some(InspectorAction::PreviewStep(node.id.clone()));
            }
            if loading {
                ui.spinner();
            }
        });
        if let Some(preview) = context.step_preview.filter(|p| p.node_id == node.id)
            && let Some(data) = &preview.data
        {
            super::preview::render_preview_table(ui, "step-preview", data, context.row_limit);
        }
    }

    action
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_list_drops_blanks() {
        assert_eq!(
            parse_column_list(" id, , email ,"),
            vec!["id".to_owned(), "email".to_owned()]
        );
        assert!(parse_column_list("").is_empty());
    }

    #[test]
    fn test_parse_mapping_skips_incomplete_pairs() {
        let mapping = parse_mapping("old: new, half:, alone, a:b");
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("old").map(String::as_str), Some("new"));
        assert_eq!(mapping.get("a").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_format_mapping_reads_back() {
        let mapping = parse_mapping("b: B, a: A");
        assert_eq!(format_mapping(&mapping), "a: A, b: B");
        assert_eq!(parse_mapping(&format_mapping(&mapping)), mapping);
    }
}
