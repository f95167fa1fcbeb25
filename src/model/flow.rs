use super::block::{BlockConfig, BlockKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Data payload of a node: its label plus the typed block configuration,
/// flattened so the backend sees `data.blockType`, `data.fileIds`, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    #[serde(flatten)]
    pub block: BlockConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub position: Position,
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

impl Node {
    /// Creates a node with a fresh id of the form `{kind}-{uuid}`.
    pub fn new(block: BlockConfig, label: impl Into<String>, position: Position) -> Self {
        let kind = block.kind();
        Self {
            id: format!("{kind}-{}", uuid::Uuid::new_v4()),
            kind,
            position,
            data: NodeData {
                label: label.into(),
                block,
            },
            selected: false,
        }
    }

    /// The fixed entry block every flow starts with.
    pub fn source() -> Self {
        Self {
            id: "source".to_owned(),
            kind: BlockKind::Source,
            position: Position::new(250.0, 40.0),
            data: NodeData {
                label: "Source".to_owned(),
                block: BlockConfig::Source,
            },
            selected: false,
        }
    }

    pub fn is_source(&self) -> bool {
        self.kind == BlockKind::Source
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("edge-{}", uuid::Uuid::new_v4()),
            source,
            target,
        }
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The `flow_data` document persisted by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl FlowData {
    /// Sorted, de-duplicated ids of every file referenced by upload blocks.
    pub fn referenced_file_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .nodes
            .iter()
            .flat_map(|n| n.data.block.file_ids().iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// A flow as returned by `/api/flows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub flow_data: FlowData,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::block::{FilterConfig, FilterOperator};

    #[test]
    fn test_node_data_is_flattened() {
        let node = Node::new(
            BlockConfig::Filter {
                config: FilterConfig {
                    column: "region".to_owned(),
                    operator: FilterOperator::Equals,
                    value: Some("North".to_owned()),
                },
            },
            "Filter rows",
            Position::new(10.0, 20.0),
        );
        let json = serde_json::to_value(&node).expect("serializable");
        assert_eq!(json["type"], "filter");
        assert_eq!(json["data"]["blockType"], "filter_rows");
        assert_eq!(json["data"]["label"], "Filter rows");
        assert_eq!(json["data"]["config"]["column"], "region");
        assert!(json.get("selected").is_none());

        let back: Node = serde_json::from_value(json).expect("deserializable");
        assert_eq!(back, node);
    }

    #[test]
    fn test_referenced_file_ids_are_deduplicated() {
        let upload = |ids: Vec<i64>| {
            Node::new(
                BlockConfig::Upload {
                    file_ids: ids,
                    batch_ids: Vec::new(),
                },
                "Upload",
                Position::default(),
            )
        };
        let data = FlowData {
            nodes: vec![Node::source(), upload(vec![7, 3]), upload(vec![3, 1])],
            edges: Vec::new(),
        };
        assert_eq!(data.referenced_file_ids(), vec![1, 3, 7]);
    }

    #[test]
    fn test_flow_record_accepts_empty_flow_data() {
        let record: FlowRecord = serde_json::from_str(
            r#"{"id": 3, "user_id": 1, "name": "Monthly", "description": null,
                "flow_data": {}, "created_at": "2024-01-01T00:00:00", "updated_at": null}"#,
        )
        .expect("valid record");
        assert_eq!(record.id, 3);
        assert!(record.flow_data.nodes.is_empty());
    }
}
