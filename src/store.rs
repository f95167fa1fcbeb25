//! The flow store: single owner of the flow's nodes, edges and save state.
//!
//! Every mutation is expressed as a [`FlowCommand`] and applied through
//! [`FlowStore::dispatch`], so the canvas, the inspector and the upload modal
//! all funnel their changes through one place. Content changes bump a
//! revision counter which drives the save button.

use crate::api::FlowApi;
use crate::error::Result;
use crate::model::{BlockConfig, Edge, FlowData, FlowRecord, Node, Position};

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq)]
pub enum FlowCommand {
    AddNode(Node),
    /// Removes a node and every edge touching it. The source node is kept.
    RemoveNode(String),
    MoveNode {
        id: String,
        position: Position,
    },
    SelectNode {
        id: String,
        selected: bool,
    },
    ClearSelection,
    UpdateConfig {
        id: String,
        config: BlockConfig,
    },
    /// Replaces the file references of an upload node.
    SetFileIds {
        id: String,
        file_ids: Vec<i64>,
        batch_ids: Vec<i64>,
    },
    Relabel {
        id: String,
        label: String,
    },
    Connect(Edge),
    RemoveEdge(String),
    Rename(String),
}

impl FlowCommand {
    /// Whether applying this command changes persisted content.
    fn is_edit(&self) -> bool {
        !matches!(self, Self::SelectNode { .. } | Self::ClearSelection)
    }
}

/// Label and enabled state of the save button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveButton {
    pub label: &'static str,
    pub enabled: bool,
}

/// What gets sent to the backend for one save.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub flow_id: Option<i64>,
    pub name: String,
    pub flow_data: FlowData,
    pub revision: u64,
}

/// See [`FlowStore::flow_for_group`].
#[derive(Debug, Clone, PartialEq)]
pub enum GroupFlow {
    Saved(i64),
    /// Save this snapshot, then use the new id
    SaveFirst(FlowSnapshot),
    /// The first save has not answered yet
    SaveInFlight,
}

#[derive(Debug, Clone)]
pub struct FlowStore {
    flow_id: Option<i64>,
    name: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    revision: u64,
    saved_revision: u64,
    saving: bool,
}

impl Default for FlowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowStore {
    /// A new, unsaved flow containing only the source block.
    pub fn new() -> Self {
        Self {
            flow_id: None,
            name: UNTITLED.to_owned(),
            nodes: vec![Node::source()],
            edges: Vec::new(),
            revision: 0,
            saved_revision: 0,
            saving: false,
        }
    }

    /// A store mirroring a flow loaded from the backend. A source block is
    /// added when the stored document has none.
    pub fn from_record(record: FlowRecord) -> Self {
        let FlowData { mut nodes, edges } = record.flow_data;
        if !nodes.iter().any(Node::is_source) {
            nodes.insert(0, Node::source());
        }
        for node in &mut nodes {
            node.selected = false;
        }
        Self {
            flow_id: Some(record.id),
            name: record.name,
            nodes,
            edges,
            revision: 0,
            saved_revision: 0,
            saving: false,
        }
    }

    pub fn flow_id(&self) -> Option<i64> {
        self.flow_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn flow_data(&self) -> FlowData {
        FlowData {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Applies one command. Returns `false` when it referenced something that
    /// does not exist or was refused (moving or deleting the source block).
    pub fn dispatch(&mut self, command: FlowCommand) -> bool {
        let is_edit = command.is_edit();
        let applied = self.apply(command);
        if applied && is_edit {
            self.revision += 1;
        }
        applied
    }

    fn apply(&mut self, command: FlowCommand) -> bool {
        match command {
            FlowCommand::AddNode(node) => {
                if self.node(&node.id).is_some() {
                    return false;
                }
                self.nodes.push(node);
                true
            }
            FlowCommand::RemoveNode(id) => {
                let before = self.nodes.len();
                self.nodes.retain(|n| n.id != id || n.is_source());
                if self.nodes.len() == before {
                    return false;
                }
                self.edges.retain(|e| !e.touches(&id));
                true
            }
            FlowCommand::MoveNode { id, position } => {
                match self.nodes.iter_mut().find(|n| n.id == id) {
                    Some(node) if !node.is_source() => {
                        node.position = position;
                        true
                    }
                    _ => false,
                }
            }
            FlowCommand::SelectNode { id, selected } => {
                match self.nodes.iter_mut().find(|n| n.id == id) {
                    Some(node) => {
                        node.selected = selected;
                        true
                    }
                    None => false,
                }
            }
            FlowCommand::ClearSelection => {
                for node in &mut self.nodes {
                    node.selected = false;
                }
                true
            }
            FlowCommand::UpdateConfig { id, config } => {
                match self.nodes.iter_mut().find(|n| n.id == id) {
                    Some(node) if node.kind == config.kind() => {
                        if node.data.block == config {
                            return false;
                        }
                        node.data.block = config;
                        true
                    }
                    _ => false,
                }
            }
            FlowCommand::SetFileIds {
                id,
                file_ids,
                batch_ids,
            } => {
                let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) else {
                    return false;
                };
                match &mut node.data.block {
                    BlockConfig::Upload {
                        file_ids: current_files,
                        batch_ids: current_batches,
                    } => {
                        if *current_files == file_ids && *current_batches == batch_ids {
                            return false;
                        }
                        *current_files = file_ids;
                        *current_batches = batch_ids;
                        true
                    }
                    _ => false,
                }
            }
            FlowCommand::Relabel { id, label } => {
                match self.nodes.iter_mut().find(|n| n.id == id) {
                    Some(node) if node.data.label != label => {
                        node.data.label = label;
                        true
                    }
                    _ => false,
                }
            }
            FlowCommand::Connect(edge) => {
                if edge.source == edge.target
                    || self.node(&edge.source).is_none()
                    || self.node(&edge.target).is_none()
                    || self
                        .edges
                        .iter()
                        .any(|e| e.source == edge.source && e.target == edge.target)
                {
                    return false;
                }
                self.edges.push(edge);
                true
            }
            FlowCommand::RemoveEdge(id) => {
                let before = self.edges.len();
                self.edges.retain(|e| e.id != id);
                self.edges.len() != before
            }
            FlowCommand::Rename(name) => {
                if self.name == name {
                    return false;
                }
                self.name = name;
                true
            }
        }
    }

    /// Save button state.
    ///
    /// | state                          | label       | enabled |
    /// |--------------------------------|-------------|---------|
    /// | new flow, pristine             | Save Flow   | no      |
    /// | new flow, edited               | Save Flow   | yes     |
    /// | save in flight                 | Saving…     | no      |
    /// | saved, unchanged               | Saved       | no      |
    /// | saved, edited since            | Update Flow | yes     |
    pub fn save_button(&self) -> SaveButton {
        if self.saving {
            return SaveButton {
                label: "Saving…",
                enabled: false,
            };
        }
        match (self.flow_id, self.is_dirty()) {
            (None, dirty) => SaveButton {
                label: "Save Flow",
                enabled: dirty && !self.name.trim().is_empty(),
            },
            (Some(_), false) => SaveButton {
                label: "Saved",
                enabled: false,
            },
            (Some(_), true) => SaveButton {
                label: "Update Flow",
                enabled: !self.name.trim().is_empty(),
            },
        }
    }

    /// Marks a save as in flight and captures what should be sent.
    pub fn begin_save(&mut self) -> FlowSnapshot {
        self.saving = true;
        FlowSnapshot {
            flow_id: self.flow_id,
            name: self.name.clone(),
            flow_data: self.flow_data(),
            revision: self.revision,
        }
    }

    /// Decides how a new file group gets its flow id. Starts the first save
    /// when the flow has never been saved and no save is running.
    pub fn flow_for_group(&mut self) -> GroupFlow {
        match self.flow_id {
            Some(id) => GroupFlow::Saved(id),
            None if self.saving => GroupFlow::SaveInFlight,
            None => GroupFlow::SaveFirst(self.begin_save()),
        }
    }

    /// Records the outcome of a save started with [`Self::begin_save`].
    ///
    /// Edits made while the request was in flight keep the flow dirty.
    pub fn finish_save(&mut self, revision: u64, outcome: &Result<FlowRecord>) {
        self.saving = false;
        if let Ok(record) = outcome {
            self.flow_id = Some(record.id);
            self.saved_revision = revision;
        }
    }
}

/// Creates or updates the flow described by `snapshot`.
pub async fn save_flow(api: &dyn FlowApi, snapshot: &FlowSnapshot) -> Result<FlowRecord> {
    let record = match snapshot.flow_id {
        Some(id) => {
            api.update_flow(id, &snapshot.name, &snapshot.flow_data)
                .await?
        }
        None => api.create_flow(&snapshot.name, &snapshot.flow_data).await?,
    };
    tracing::info!(flow_id = record.id, name = %record.name, "Flow saved");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SheetpilotError;
    use crate::model::{FilterConfig, Position};

    fn filter_node() -> Node {
        Node::new(
            BlockConfig::Filter {
                config: FilterConfig::default(),
            },
            "Filter rows",
            Position::new(100.0, 200.0),
        )
    }

    fn saved_record(id: i64) -> FlowRecord {
        FlowRecord {
            id,
            name: "Monthly".to_owned(),
            description: None,
            flow_data: FlowData::default(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_new_flow_has_fixed_source() {
        let mut store = FlowStore::new();
        assert_eq!(store.nodes().len(), 1);
        assert!(!store.dispatch(FlowCommand::MoveNode {
            id: "source".to_owned(),
            position: Position::new(0.0, 0.0),
        }));
        assert!(!store.dispatch(FlowCommand::RemoveNode("source".to_owned())));
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_remove_node_cascades_to_edges() {
        let mut store = FlowStore::new();
        let a = filter_node();
        let b = filter_node();
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        store.dispatch(FlowCommand::AddNode(a));
        store.dispatch(FlowCommand::AddNode(b));
        store.dispatch(FlowCommand::Connect(Edge::new("source", a_id.clone())));
        store.dispatch(FlowCommand::Connect(Edge::new(a_id.clone(), b_id.clone())));
        assert_eq!(store.edges().len(), 2);

        assert!(store.dispatch(FlowCommand::RemoveNode(a_id)));
        assert!(store.edges().is_empty());
        assert!(store.node(&b_id).is_some());
    }

    #[test]
    fn test_connect_requires_existing_endpoints() {
        let mut store = FlowStore::new();
        assert!(!store.dispatch(FlowCommand::Connect(Edge::new("source", "ghost"))));
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_selection_is_not_an_edit() {
        let mut store = FlowStore::new();
        store.dispatch(FlowCommand::SelectNode {
            id: "source".to_owned(),
            selected: true,
        });
        assert_eq!(store.selected_ids(), vec!["source".to_owned()]);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_update_config_rejects_kind_change() {
        let mut store = FlowStore::new();
        let node = filter_node();
        let id = node.id.clone();
        store.dispatch(FlowCommand::AddNode(node));
        assert!(!store.dispatch(FlowCommand::UpdateConfig {
            id,
            config: BlockConfig::Source,
        }));
    }

    #[test]
    fn test_save_button_state_machine() {
        let mut store = FlowStore::new();
        assert_eq!(
            store.save_button(),
            SaveButton {
                label: "Save Flow",
                enabled: false
            }
        );

        store.dispatch(FlowCommand::Rename("Monthly".to_owned()));
        assert_eq!(
            store.save_button(),
            SaveButton {
                label: "Save Flow",
                enabled: true
            }
        );

        let snapshot = store.begin_save();
        assert_eq!(store.save_button().label, "Saving…");
        assert!(!store.save_button().enabled);

        store.finish_save(snapshot.revision, &Ok(saved_record(11)));
        assert_eq!(store.flow_id(), Some(11));
        assert_eq!(
            store.save_button(),
            SaveButton {
                label: "Saved",
                enabled: false
            }
        );

        store.dispatch(FlowCommand::AddNode(filter_node()));
        assert_eq!(
            store.save_button(),
            SaveButton {
                label: "Update Flow",
                enabled: true
            }
        );
    }

    #[test]
    fn test_edit_during_save_stays_dirty() {
        let mut store = FlowStore::new();
        store.dispatch(FlowCommand::Rename("Monthly".to_owned()));
        let snapshot = store.begin_save();
        store.dispatch(FlowCommand::AddNode(filter_node()));
        store.finish_save(snapshot.revision, &Ok(saved_record(2)));
        assert_eq!(store.save_button().label, "Update Flow");
    }

    #[test]
    fn test_failed_save_returns_to_editable() {
        let mut store = FlowStore::new();
        store.dispatch(FlowCommand::Rename("Monthly".to_owned()));
        let snapshot = store.begin_save();
        store.finish_save(snapshot.revision, &Err(SheetpilotError::Http("down".to_owned())));
        assert_eq!(store.flow_id(), None);
        assert!(store.save_button().enabled);
    }

    #[test]
    fn test_flow_for_group_saves_once() {
        let mut store = FlowStore::new();
        store.dispatch(FlowCommand::Rename("Monthly".to_owned()));

        let GroupFlow::SaveFirst(snapshot) = store.flow_for_group() else {
            panic!("an unsaved flow is saved first");
        };
        assert!(store.is_saving());
        assert_eq!(store.flow_for_group(), GroupFlow::SaveInFlight);

        store.finish_save(snapshot.revision, &Ok(saved_record(12)));
        assert_eq!(store.flow_for_group(), GroupFlow::Saved(12));
        assert!(!store.is_saving());
    }

    #[test]
    fn test_from_record_inserts_source() {
        let store = FlowStore::from_record(saved_record(5));
        assert!(store.nodes().iter().any(Node::is_source));
        assert_eq!(store.save_button().label, "Saved");
    }
}
