//! Block presentation: per-kind summaries and the shared node container.

use crate::model::{
    BlockConfig, BlockKind, FilterConfig, Node, OutputConfig, TransformConfig, TransformOperation,
};
use crate::theme;
use eframe::egui;
use egui_phosphor::regular as icons;

/// What the user asked a block to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAction {
    Delete,
    AddNext,
    Open,
}

pub fn icon(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Source => icons::PLAY,
        BlockKind::Upload => icons::UPLOAD_SIMPLE,
        BlockKind::Filter => icons::FUNNEL,
        BlockKind::Transform => icons::SHUFFLE,
        BlockKind::Output => icons::DOWNLOAD_SIMPLE,
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("1 {one}")
    } else {
        format!("{n} {many}")
    }
}

fn list_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_owned()
    } else {
        items.join(", ")
    }
}

pub fn filter_summary(filter: &FilterConfig) -> String {
    if filter.column.trim().is_empty() {
        return "Not configured".to_owned();
    }
    match (&filter.value, filter.operator.needs_value()) {
        (Some(value), true) => format!("{} {} {value}", filter.column, filter.operator.symbol()),
        (None, true) => format!("{} {} …", filter.column, filter.operator.symbol()),
        (_, false) => format!("{} {}", filter.column, filter.operator.symbol()),
    }
}

pub fn operation_summary(operation: &TransformOperation) -> String {
    match operation {
        TransformOperation::SortRows { columns, .. } if columns.is_empty() => {
            "Pick a sort column".to_owned()
        }
        TransformOperation::SortRows { columns, ascending } => format!(
            "Sort by {} ({})",
            columns.join(", "),
            if *ascending { "ascending" } else { "descending" }
        ),
        TransformOperation::RenameColumns { mapping } => {
            format!("{} renamed", plural(mapping.len(), "column", "columns"))
        }
        TransformOperation::RearrangeColumns { order } => {
            format!("Order: {}", list_or(order, "unchanged"))
        }
        TransformOperation::RemoveDuplicates { columns } => {
            format!("Unique by {}", list_or(columns, "all columns"))
        }
        TransformOperation::RemoveColumns { columns } => {
            format!("Drop {}", list_or(columns, "nothing yet"))
        }
        TransformOperation::DeleteRows { filter } => {
            format!("Delete where {}", filter_summary(filter))
        }
        TransformOperation::JoinLookup {
            lookup_file_id,
            left_key,
            right_key,
        } => match lookup_file_id {
            Some(file_id) => format!("Join file #{file_id} on {left_key} = {right_key}"),
            None => "Pick a lookup file".to_owned(),
        },
        TransformOperation::AppendFiles => "Stack all sources".to_owned(),
    }
}

fn transform_lines(config: &TransformConfig) -> Vec<String> {
    let mut lines = vec![operation_summary(&config.operation)];
    if !config.targets.is_empty() {
        lines.push(format!(
            "{} → {}",
            config.mode.label(),
            plural(config.targets.len(), "target", "targets")
        ));
    }
    lines
}

fn output_lines(output: &OutputConfig) -> Vec<String> {
    if output.outputs.is_empty() {
        return vec!["No output files".to_owned()];
    }
    output
        .outputs
        .iter()
        .map(|o| format!("{} ({})", o.file_name, plural(o.sheets.len(), "sheet", "sheets")))
        .collect()
}

/// Human readable lines describing a block's configuration.
pub fn summary(block: &BlockConfig) -> Vec<String> {
    match block {
        BlockConfig::Source => vec!["Start of flow".to_owned()],
        BlockConfig::Upload {
            file_ids,
            batch_ids,
        } => {
            let mut line = if file_ids.is_empty() {
                "No files yet".to_owned()
            } else {
                plural(file_ids.len(), "file", "files")
            };
            if !batch_ids.is_empty() {
                line = format!("{line}, {}", plural(batch_ids.len(), "group", "groups"));
            }
            vec![line]
        }
        BlockConfig::Filter { config } => vec![filter_summary(config)],
        BlockConfig::Transform { config } => transform_lines(config),
        BlockConfig::Output { output } => output_lines(output),
    }
}

/// Renders one node inside the shared container.
///
/// The delete and "add next" buttons are added after the caller registered
/// the node body, so they sit above it and a click on them never reaches the
/// body's select or drag handling.
pub struct BlockWidget<'a> {
    node: &'a Node,
}

impl<'a> BlockWidget<'a> {
    pub fn new(node: &'a Node) -> Self {
        Self { node }
    }

    pub fn show(self, ui: &mut egui::Ui) -> (egui::Response, Option<BlockAction>) {
        let node = self.node;
        let mut action = None;
        let inner = theme::node_frame(node.kind, node.selected).show(ui, |ui| {
            ui.set_width(theme::NODE_WIDTH - 2.0 * theme::MARGIN_NODE);
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(icon(node.kind))
                        .color(theme::block_color(node.kind))
                        .size(16.0),
                );
                ui.label(egui::RichText::new(&node.data.label).strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if !node.is_source()
                        && ui
                            .small_button(icons::TRASH)
                            .on_hover_text("Delete block")
                            .clicked()
                    {
                        action = Some(BlockAction::Delete);
                    }
                    if ui
                        .small_button(icons::GEAR)
                        .on_hover_text("Configure")
                        .clicked()
                    {
                        action = Some(BlockAction::Open);
                    }
                });
            });
            ui.add_space(theme::SPACING_TINY);
            for line in summary(&node.data.block) {
                ui.label(egui::RichText::new(line).small().weak());
            }
            if node.kind != BlockKind::Output {
                ui.add_space(theme::SPACING_TINY);
                ui.vertical_centered(|ui| {
                    if ui
                        .small_button(icons::PLUS)
                        .on_hover_text("Add next operation")
                        .clicked()
                    {
                        action = Some(BlockAction::AddNext);
                    }
                });
            }
        });
        (inner.response, action)
    }
}
