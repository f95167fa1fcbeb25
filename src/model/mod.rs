//! View models mirrored from the backend plus the typed block configuration.

pub mod block;
pub mod files;
pub mod flow;

pub use block::{
    BlockConfig, BlockKind, BlockTemplate, DestinationTarget, FilterConfig, FilterOperator,
    OutputConfig, OutputFile, OutputSheet, TargetMode, TransformConfig, TransformOperation,
};
pub use files::{BatchRecord, FilePreview, FileRecord};
pub use flow::{Edge, FlowData, FlowRecord, Node, NodeData, Position};
