//! The flow canvas.
//!
//! Renders the store's nodes and edges over a pannable, zoomable grid and
//! turns pointer and keyboard input into store commands. The canvas keeps no
//! copy of the graph; it only remembers view state (viewport, measured node
//! sizes, an in-progress connection).

pub mod changes;
pub mod drop;
pub mod viewport;

pub use changes::{NodeChange, add_operation_after, apply_node_changes, connect, remove_selected};
pub use drop::{BLOCK_MIME, DragPayload, node_from_drop};
pub use viewport::Viewport;

use crate::blocks::{BlockAction, BlockWidget};
use crate::model::{Node, Position};
use crate::store::{FlowCommand, FlowStore};
use crate::theme;
use eframe::egui;
use egui::{Color32, Id, Pos2, Rect, Sense, Stroke, Vec2};
use std::collections::HashMap;

const DEFAULT_NODE_HEIGHT: f32 = 90.0;
/// Points per wheel "line" when the platform reports line units.
const WHEEL_LINE_HEIGHT: f32 = 40.0;

/// What happened on the canvas this frame that the app reacts to.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CanvasResponse {
    /// Node whose inspector should open
    pub opened: Option<String>,
    /// Node created by a palette drop or "add next"
    pub created: Option<String>,
}

#[derive(Debug, Default)]
pub struct FlowCanvas {
    pub viewport: Viewport,
    node_sizes: HashMap<String, Vec2>,
    /// Source node of a connection being dragged
    connecting_from: Option<String>,
}

impl FlowCanvas {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    fn node_rect(&self, origin: Pos2, node: &Node) -> Rect {
        let size = self
            .node_sizes
            .get(&node.id)
            .copied()
            .unwrap_or(Vec2::new(theme::NODE_WIDTH, DEFAULT_NODE_HEIGHT));
        let min = self
            .viewport
            .canvas_to_screen(origin, Pos2::new(node.position.x, node.position.y));
        Rect::from_min_size(min, size)
    }

    pub fn show(&mut self, ui: &mut egui::Ui, store: &mut FlowStore) -> CanvasResponse {
        let mut out = CanvasResponse::default();
        let (background, painter) =
            ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let canvas_rect = background.rect;
        let origin = canvas_rect.min;

        self.handle_wheel(ui, &background, origin);
        if background.dragged() && self.connecting_from.is_none() {
            self.viewport.pan += background.drag_delta();
        }
        if background.clicked() {
            store.dispatch(FlowCommand::ClearSelection);
        }

        self.paint_grid(&painter, canvas_rect);
        self.paint_edges(&painter, origin, store);

        let mut changes = Vec::new();
        let mut actions = Vec::new();
        let nodes: Vec<Node> = store.nodes().to_vec();
        for node in &nodes {
            let rect = self.node_rect(origin, node);
            if !canvas_rect.intersects(rect) {
                continue;
            }
            let body = ui.interact(rect, Id::new(("flow-node", &node.id)), Sense::click_and_drag());
            if body.dragged() && !node.is_source() {
                let delta = body.drag_delta() / self.viewport.zoom;
                changes.push(NodeChange::Position {
                    id: node.id.clone(),
                    position: Position::new(node.position.x + delta.x, node.position.y + delta.y),
                });
            }
            if body.clicked() {
                let additive = ui.input(|i| i.modifiers.shift);
                if !additive {
                    store.dispatch(FlowCommand::ClearSelection);
                }
                changes.push(NodeChange::Select {
                    id: node.id.clone(),
                    selected: !(additive && node.selected),
                });
            }
            if body.double_clicked() {
                out.opened = Some(node.id.clone());
            }

            // Registered after the body so the block's buttons win the click.
            let builder = egui::UiBuilder::new()
                .id_salt(("flow-node-ui", &node.id))
                .max_rect(Rect::from_min_size(
                    rect.min,
                    Vec2::new(rect.width(), canvas_rect.height().max(rect.height())),
                ));
            let mut node_ui = ui.new_child(builder);
            node_ui.set_clip_rect(canvas_rect);
            let (widget, action) = BlockWidget::new(node).show(&mut node_ui);
            self.node_sizes.insert(node.id.clone(), widget.rect.size());
            if let Some(action) = action {
                actions.push((node.id.clone(), action));
            }

            self.connection_handles(ui, &painter, node, widget.rect, store, &nodes, origin);
        }
        apply_node_changes(store, changes);

        for (id, action) in actions {
            match action {
                BlockAction::Delete => {
                    apply_node_changes(store, vec![NodeChange::Remove { id }]);
                }
                BlockAction::AddNext => {
                    out.created =
                        add_operation_after(store, &id, &changes::default_next_template());
                }
                BlockAction::Open => out.opened = Some(id),
            }
        }

        if let Some(payload) = background.dnd_release_payload::<DragPayload>() {
            let pointer = ui
                .ctx()
                .pointer_interact_pos()
                .unwrap_or(canvas_rect.center());
            let at = self.viewport.screen_to_canvas(origin, pointer);
            if let Some(node) = node_from_drop(&payload, Position::new(at.x, at.y)) {
                out.created = Some(node.id.clone());
                store.dispatch(FlowCommand::AddNode(node));
            }
        } else if background.dnd_hover_payload::<DragPayload>().is_some() {
            painter.rect_stroke(
                canvas_rect.shrink(2.0),
                4.0,
                Stroke::new(2.0, theme::ACCENT_COLOR),
                egui::StrokeKind::Inside,
            );
        }

        let delete_pressed = ui.input(|i| {
            i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)
        });
        if delete_pressed && !ui.ctx().wants_keyboard_input() {
            let removed = remove_selected(store);
            if removed > 0 {
                tracing::debug!(removed, "Selected nodes deleted");
            }
        }

        let live: std::collections::HashSet<&str> =
            store.nodes().iter().map(|n| n.id.as_str()).collect();
        self.node_sizes.retain(|id, _| live.contains(id.as_str()));
        out
    }

    /// Replaces egui's scrolling: wheel pans, modifier plus wheel zooms at
    /// the cursor.
    fn handle_wheel(&mut self, ui: &egui::Ui, background: &egui::Response, origin: Pos2) {
        if !background.contains_pointer() {
            return;
        }
        let Some(pointer) = ui.input(|i| i.pointer.hover_pos()) else {
            return;
        };
        let page = background.rect.size();
        let wheel: Vec<(Vec2, bool)> = ui.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::MouseWheel {
                        unit,
                        delta,
                        modifiers,
                        ..
                    } => {
                        let points = match unit {
                            egui::MouseWheelUnit::Point => *delta,
                            egui::MouseWheelUnit::Line => *delta * WHEEL_LINE_HEIGHT,
                            egui::MouseWheelUnit::Page => *delta * page,
                        };
                        Some((points, modifiers.command || modifiers.ctrl))
                    }
                    _ => None,
                })
                .collect()
        });
        for (delta, zoom) in wheel {
            // egui reports how content should move; the viewport expects the
            // wheel's own direction.
            self.viewport.handle_wheel(origin, pointer, -delta, zoom);
        }
    }

    fn paint_grid(&self, painter: &egui::Painter, rect: Rect) {
        let spacing = theme::GRID_SPACING * self.viewport.zoom;
        if spacing < 6.0 {
            return;
        }
        let stroke = Stroke::new(1.0, theme::GRID_COLOR);
        let offset = Vec2::new(
            self.viewport.pan.x.rem_euclid(spacing),
            self.viewport.pan.y.rem_euclid(spacing),
        );
        let mut x = rect.left() + offset.x;
        while x < rect.right() {
            painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
            x += spacing;
        }
        let mut y = rect.top() + offset.y;
        while y < rect.bottom() {
            painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
            y += spacing;
        }
    }

    fn output_handle(rect: Rect) -> Pos2 {
        rect.center_bottom()
    }

    fn input_handle(rect: Rect) -> Pos2 {
        rect.center_top()
    }

    fn paint_edges(&self, painter: &egui::Painter, origin: Pos2, store: &FlowStore) {
        for edge in store.edges() {
            let (Some(source), Some(target)) = (store.node(&edge.source), store.node(&edge.target))
            else {
                continue;
            };
            let from = Self::output_handle(self.node_rect(origin, source));
            let to = Self::input_handle(self.node_rect(origin, target));
            paint_bezier(painter, from, to, theme::EDGE_COLOR);
        }
    }

    #[expect(clippy::too_many_arguments, reason = "per-node rendering context")]
    fn connection_handles(
        &mut self,
        ui: &egui::Ui,
        painter: &egui::Painter,
        node: &Node,
        rect: Rect,
        store: &mut FlowStore,
        nodes: &[Node],
        origin: Pos2,
    ) {
        let radius = theme::HANDLE_RADIUS;
        if !node.is_source() {
            painter.circle_filled(Self::input_handle(rect), radius, theme::EDGE_COLOR);
        }

        let out_pos = Self::output_handle(rect);
        let handle = ui.interact(
            Rect::from_center_size(out_pos, Vec2::splat(radius * 2.5)),
            Id::new(("flow-node-out", &node.id)),
            Sense::drag(),
        );
        let color = if handle.hovered() || handle.dragged() {
            Color32::WHITE
        } else {
            theme::block_color(node.kind)
        };
        painter.circle_filled(out_pos, radius, color);

        if handle.drag_started() {
            self.connecting_from = Some(node.id.clone());
        }
        if handle.dragged()
            && let Some(pointer) = ui.ctx().pointer_interact_pos()
        {
            paint_bezier(painter, out_pos, pointer, theme::ACCENT_COLOR);
        }
        if handle.drag_stopped() {
            let from = self.connecting_from.take();
            let pointer = ui.ctx().pointer_interact_pos();
            if let (Some(from), Some(pointer)) = (from, pointer) {
                let target = nodes.iter().find(|candidate| {
                    !candidate.is_source()
                        && candidate.id != from
                        && self.node_rect(origin, candidate).expand(radius).contains(pointer)
                });
                if let Some(target) = target {
                    connect(store, &from, &target.id);
                }
            }
        }
    }
}

fn paint_bezier(painter: &egui::Painter, from: Pos2, to: Pos2, color: Color32) {
    let bend = ((to.y - from.y).abs() * 0.5).max(30.0);
    let shape = egui::epaint::CubicBezierShape::from_points_stroke(
        [
            from,
            from + Vec2::new(0.0, bend),
            to - Vec2::new(0.0, bend),
            to,
        ],
        false,
        Color32::TRANSPARENT,
        Stroke::new(2.0, color),
    );
    painter.add(shape);
}
