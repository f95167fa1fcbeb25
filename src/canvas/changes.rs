//! Canvas interactions expressed as store commands.

use crate::model::{BlockConfig, BlockKind, BlockTemplate, Edge, Node, Position};
use crate::store::{FlowCommand, FlowStore};

/// Vertical gap between a node and the one "add next" places below it.
pub const NEXT_NODE_OFFSET: f32 = 140.0;

/// A change reported by the canvas for one node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Position { id: String, position: Position },
    Select { id: String, selected: bool },
    Remove { id: String },
}

/// Merges canvas changes into the store. Position changes of the source
/// block are dropped. Returns how many changes were applied.
pub fn apply_node_changes(store: &mut FlowStore, changes: Vec<NodeChange>) -> usize {
    let mut applied = 0;
    for change in changes {
        let command = match change {
            NodeChange::Position { id, position } => {
                if store.node(&id).is_none_or(Node::is_source) {
                    continue;
                }
                FlowCommand::MoveNode { id, position }
            }
            NodeChange::Select { id, selected } => FlowCommand::SelectNode { id, selected },
            NodeChange::Remove { id } => FlowCommand::RemoveNode(id),
        };
        if store.dispatch(command) {
            applied += 1;
        }
    }
    applied
}

/// Appends an edge for a completed connection. Self-loops and repeated
/// connections are refused by the store.
pub fn connect(store: &mut FlowStore, source: &str, target: &str) -> bool {
    let connected = store.dispatch(FlowCommand::Connect(Edge::new(source, target)));
    if connected {
        tracing::debug!(%source, %target, "Nodes connected");
    }
    connected
}

/// Removes every selected node except the source block.
pub fn remove_selected(store: &mut FlowStore) -> usize {
    let changes = store
        .selected_ids()
        .into_iter()
        .map(|id| NodeChange::Remove { id })
        .collect();
    apply_node_changes(store, changes)
}

/// Adds a block below `after_id` and connects the two. Returns the new id.
pub fn add_operation_after(
    store: &mut FlowStore,
    after_id: &str,
    template: &BlockTemplate,
) -> Option<String> {
    let anchor = store.node(after_id)?.position;
    let config = match BlockConfig::from_template(template) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot add operation");
            return None;
        }
    };
    let node = Node::new(
        config,
        template.label.clone(),
        Position::new(anchor.x, anchor.y + NEXT_NODE_OFFSET),
    );
    let id = node.id.clone();
    store.dispatch(FlowCommand::AddNode(node));
    connect(store, after_id, &id);
    Some(id)
}

/// Template the "+" affordance uses: a transform step the user then configures.
pub fn default_next_template() -> BlockTemplate {
    BlockTemplate::new(BlockKind::Transform, "sort_rows", "Sort rows")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_position_changes_are_ignored() {
        let mut store = FlowStore::new();
        let applied = apply_node_changes(
            &mut store,
            vec![NodeChange::Position {
                id: "source".to_owned(),
                position: Position::new(999.0, 999.0),
            }],
        );
        assert_eq!(applied, 0);
        assert_eq!(
            store.node("source").map(|n| n.position),
            Some(Position::new(250.0, 40.0))
        );
    }

    #[test]
    fn test_add_operation_after_connects() {
        let mut store = FlowStore::new();
        let template = BlockTemplate::new(BlockKind::Transform, "remove_duplicates", "Dedupe");
        let id = add_operation_after(&mut store, "source", &template).expect("added");
        let node = store.node(&id).expect("exists");
        assert!((node.position.y - (40.0 + NEXT_NODE_OFFSET)).abs() < f32::EPSILON);
        assert_eq!(store.edges().len(), 1);
        assert!(store.edges().iter().all(|e| e.source == "source" && e.target == id));
    }

    #[test]
    fn test_remove_selected_spares_source() {
        let mut store = FlowStore::new();
        let id = add_operation_after(&mut store, "source", &default_next_template())
            .expect("added");
        let changes = vec![
            NodeChange::Select {
                id: "source".to_owned(),
                selected: true,
            },
            NodeChange::Select {
                id: id.clone(),
                selected: true,
            },
        ];
        assert_eq!(apply_node_changes(&mut store, changes), 2);
        assert_eq!(remove_selected(&mut store), 1);
        assert!(store.node("source").is_some());
        assert!(store.node(&id).is_none());
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_repeated_connections_are_rejected() {
        let mut store = FlowStore::new();
        let id = add_operation_after(&mut store, "source", &default_next_template())
            .expect("added");
        assert!(!connect(&mut store, "source", &id));
        assert_eq!(store.edges().len(), 1);
        assert!(!connect(&mut store, &id, &id));

        let next = add_operation_after(&mut store, &id, &default_next_template()).expect("added");
        assert!(connect(&mut store, "source", &next));
        assert!(!connect(&mut store, "source", &next));
        assert_eq!(store.edges().len(), 3);
    }

    #[test]
    fn test_add_next_creates_a_transform_step() {
        let mut store = FlowStore::new();
        let id = add_operation_after(&mut store, "source", &default_next_template())
            .expect("added");
        let node = store.node(&id).expect("exists");
        assert_eq!(node.kind, BlockKind::Transform);
        assert!(matches!(node.data.block, BlockConfig::Transform { .. }));
    }
}
