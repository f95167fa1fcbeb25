//! Palette drag-and-drop payloads.
//!
//! The palette hands the canvas a [`DragPayload`]: a MIME type plus a JSON
//! body describing the [`BlockTemplate`]. Payloads that are not ours or do
//! not parse are logged and ignored.

use crate::error::{Result, SheetpilotError};
use crate::model::{BlockConfig, BlockTemplate, Node, Position};

pub const BLOCK_MIME: &str = "application/x-sheetpilot-block";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload {
    pub mime: String,
    pub data: String,
}

impl DragPayload {
    pub fn for_template(template: &BlockTemplate) -> Result<Self> {
        Ok(Self {
            mime: BLOCK_MIME.to_owned(),
            data: serde_json::to_string(template)?,
        })
    }
}

pub fn parse_template(payload: &DragPayload) -> Result<BlockTemplate> {
    if payload.mime != BLOCK_MIME {
        return Err(SheetpilotError::Parse(format!(
            "Unsupported drop type '{}'",
            payload.mime
        )));
    }
    Ok(serde_json::from_str(&payload.data)?)
}

/// Builds the node a drop at `position` (canvas coordinates) creates, or
/// `None` when the payload is unusable.
pub fn node_from_drop(payload: &DragPayload, position: Position) -> Option<Node> {
    let built = parse_template(payload).and_then(|template| {
        let config = BlockConfig::from_template(&template)?;
        Ok(Node::new(config, template.label, position))
    });
    match built {
        Ok(node) => {
            tracing::debug!(node_id = %node.id, "Block dropped on canvas");
            Some(node)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid drop payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;

    #[test]
    fn test_palette_payload_creates_node() {
        let template = BlockTemplate::new(BlockKind::Transform, "sort_rows", "Sort rows");
        let payload = DragPayload::for_template(&template).expect("serializable");
        let node = node_from_drop(&payload, Position::new(12.0, 34.0)).expect("node");
        assert_eq!(node.kind, BlockKind::Transform);
        assert_eq!(node.data.label, "Sort rows");
        assert_eq!(node.position, Position::new(12.0, 34.0));
    }

    #[test]
    fn test_wire_format() {
        let payload = DragPayload {
            mime: BLOCK_MIME.to_owned(),
            data: r#"{"type": "filter", "id": "filter_rows", "label": "Filter rows"}"#.to_owned(),
        };
        let template = parse_template(&payload).expect("valid");
        assert_eq!(template.kind, BlockKind::Filter);
    }

    #[test]
    fn test_bad_payloads_are_ignored() {
        let garbage = DragPayload {
            mime: BLOCK_MIME.to_owned(),
            data: "{not json".to_owned(),
        };
        assert!(node_from_drop(&garbage, Position::default()).is_none());

        let foreign = DragPayload {
            mime: "text/plain".to_owned(),
            data: r#"{"type": "filter", "id": "filter_rows", "label": "x"}"#.to_owned(),
        };
        assert!(node_from_drop(&foreign, Position::default()).is_none());

        let unknown = DragPayload {
            mime: BLOCK_MIME.to_owned(),
            data: r#"{"type": "transform", "id": "pivot", "label": "Pivot"}"#.to_owned(),
        };
        assert!(node_from_drop(&unknown, Position::default()).is_none());
    }
}
