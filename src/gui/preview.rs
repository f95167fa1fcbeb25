use crate::model::FilePreview;
use eframe::egui;
use egui_extras::{Column, TableBuilder};

const ROW_HEIGHT: f32 = 20.0;

/// Renders a preview sample as a striped, scrollable table. At most
/// `row_limit` rows are shown.
pub fn render_preview_table(ui: &mut egui::Ui, id_salt: &str, preview: &FilePreview, row_limit: usize) {
    ui.horizontal(|ui| {
        ui.label(
            egui::RichText::new(format!(
                "{} rows × {} columns",
                preview.row_count,
                preview.columns.len()
            ))
            .weak(),
        );
        if preview.preview_rows.len() < preview.row_count {
            ui.label(
                egui::RichText::new(format!(
                    "(showing first {})",
                    preview.preview_rows.len().min(row_limit)
                ))
                .weak(),
            );
        }
    });

    if preview.columns.is_empty() {
        ui.label("No columns");
        return;
    }

    let rows = preview.preview_rows.len().min(row_limit);
    ui.push_id(id_salt, |ui| {
        egui::ScrollArea::horizontal().show(ui, |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                .columns(Column::initial(120.0).at_least(60.0), preview.columns.len())
                .min_scrolled_height(0.0)
                .max_scroll_height(360.0)
                .header(ROW_HEIGHT + 8.0, |mut header| {
                    for column in &preview.columns {
                        header.col(|ui| {
                            ui.strong(column).on_hover_text(
                                preview
                                    .dtypes
                                    .get(column)
                                    .map_or("unknown type", String::as_str),
                            );
                        });
                    }
                })
                .body(|body| {
                    body.rows(ROW_HEIGHT, rows, |mut row| {
                        let index = row.index();
                        for column in &preview.columns {
                            row.col(|ui| {
                                ui.label(preview.cell_text(index, column));
                            });
                        }
                    });
                });
        });
    });
}
