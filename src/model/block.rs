//! Typed block configuration.
//!
//! Each node carries a [`BlockConfig`], a tagged union keyed by `blockType`
//! in the serialized `flow_data`. Transform steps use the backend's
//! transform registry id as their `blockType`. Key names that the backend
//! reads (`fileIds`, `config`, `output.outputs[].fileName`,
//! `sheets[].sheetName`) are kept.

use crate::error::{Result, SheetpilotError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Source,
    Upload,
    Filter,
    Transform,
    Output,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Upload => "upload",
            Self::Filter => "filter",
            Self::Transform => "transform",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    IsBlank,
    IsNotBlank,
}

impl FilterOperator {
    pub const ALL: [Self; 8] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::NotContains,
        Self::GreaterThan,
        Self::LessThan,
        Self::IsBlank,
        Self::IsNotBlank,
    ];

    /// Short symbol used in block summaries.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "≠",
            Self::Contains => "contains",
            Self::NotContains => "does not contain",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::IsBlank => "is blank",
            Self::IsNotBlank => "is not blank",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Equals => "Equals",
            Self::NotEquals => "Not equals",
            Self::Contains => "Contains",
            Self::NotContains => "Does not contain",
            Self::GreaterThan => "Greater than",
            Self::LessThan => "Less than",
            Self::IsBlank => "Is blank",
            Self::IsNotBlank => "Is not blank",
        }
    }

    pub fn needs_value(self) -> bool {
        !matches!(self, Self::IsBlank | Self::IsNotBlank)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub column: String,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.column.trim().is_empty() {
            return Err(SheetpilotError::Validation(
                "Choose a column to filter on".to_owned(),
            ));
        }
        if self.operator.needs_value()
            && self.value.as_deref().is_none_or(|v| v.trim().is_empty())
        {
            return Err(SheetpilotError::Validation(format!(
                "'{}' needs a value",
                self.operator.label()
            )));
        }
        Ok(())
    }
}

/// A transform step. On the wire each step is tagged with the backend's
/// registry id in `blockType` and carries a flat `config`; see [`StepWire`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "StepWire", from = "StepWire")]
pub enum TransformOperation {
    SortRows {
        columns: Vec<String>,
        ascending: bool,
    },
    RenameColumns {
        mapping: BTreeMap<String, String>,
    },
    RearrangeColumns {
        order: Vec<String>,
    },
    /// An empty column list compares whole rows
    RemoveDuplicates {
        columns: Vec<String>,
    },
    RemoveColumns {
        columns: Vec<String>,
    },
    DeleteRows {
        filter: FilterConfig,
    },
    JoinLookup {
        lookup_file_id: Option<i64>,
        left_key: String,
        right_key: String,
    },
    AppendFiles,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RemoveMode {
    #[default]
    Columns,
    Rows,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
struct ColumnSelection {
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RowSelection {
    #[serde(default)]
    rules: Vec<FilterConfig>,
    #[serde(rename = "match", default = "match_any")]
    match_rule: String,
}

fn match_any() -> String {
    "any".to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct RemoveConfig {
    #[serde(default)]
    mode: RemoveMode,
    #[serde(rename = "columnSelection", default, skip_serializing_if = "Option::is_none")]
    column_selection: Option<ColumnSelection>,
    #[serde(rename = "rowSelection", default, skip_serializing_if = "Option::is_none")]
    row_selection: Option<RowSelection>,
}

/// Step shape read by the transform registry: `{blockType, config}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "blockType", content = "config", rename_all = "snake_case")]
enum StepWire {
    SortRows {
        #[serde(default)]
        columns: Vec<String>,
        #[serde(default = "default_true")]
        ascending: bool,
    },
    RenameColumns {
        #[serde(default)]
        mapping: BTreeMap<String, String>,
    },
    RearrangeColumns {
        #[serde(default)]
        column_order: Vec<String>,
    },
    RemoveDuplicates {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        columns: Option<Vec<String>>,
    },
    #[serde(rename = "remove_column", alias = "remove_columns_rows")]
    RemoveColumnsRows(RemoveConfig),
    JoinLookup {
        #[serde(rename = "lookupFileId", default)]
        lookup_file_id: Option<i64>,
        #[serde(default)]
        on: String,
        #[serde(rename = "lookupOn", default)]
        lookup_on: String,
    },
    AppendFiles,
}

impl From<TransformOperation> for StepWire {
    fn from(op: TransformOperation) -> Self {
        match op {
            TransformOperation::SortRows { columns, ascending } => Self::SortRows { columns, ascending },
            TransformOperation::RenameColumns { mapping } => Self::RenameColumns { mapping },
            TransformOperation::RearrangeColumns { order } => Self::RearrangeColumns {
                column_order: order,
            },
            TransformOperation::RemoveDuplicates { columns } => Self::RemoveDuplicates {
                columns: (!columns.is_empty()).then_some(columns),
            },
            TransformOperation::RemoveColumns { columns } => Self::RemoveColumnsRows(RemoveConfig {
                mode: RemoveMode::Columns,
                column_selection: Some(ColumnSelection { names: columns }),
                row_selection: None,
            }),
            TransformOperation::DeleteRows { filter } => Self::RemoveColumnsRows(RemoveConfig {
                mode: RemoveMode::Rows,
                column_selection: None,
                row_selection: Some(RowSelection {
                    rules: vec![filter],
                    match_rule: match_any(),
                }),
            }),
            TransformOperation::JoinLookup {
                lookup_file_id,
                left_key,
                right_key,
            } => Self::JoinLookup {
                lookup_file_id,
                on: left_key,
                lookup_on: right_key,
            },
            TransformOperation::AppendFiles => Self::AppendFiles,
        }
    }
}

impl From<StepWire> for TransformOperation {
    fn from(wire: StepWire) -> Self {
        match wire {
            StepWire::SortRows { columns, ascending } => Self::SortRows { columns, ascending },
            StepWire::RenameColumns { mapping } => Self::RenameColumns { mapping },
            StepWire::RearrangeColumns { column_order } => Self::RearrangeColumns {
                order: column_order,
            },
            StepWire::RemoveDuplicates { columns } => Self::RemoveDuplicates {
                columns: columns.unwrap_or_default(),
            },
            StepWire::RemoveColumnsRows(config) => match config.mode {
                RemoveMode::Columns => Self::RemoveColumns {
                    columns: config.column_selection.unwrap_or_default().names,
                },
                // Only the first rule is editable; extra rules are dropped.
                RemoveMode::Rows => Self::DeleteRows {
                    filter: config
                        .row_selection
                        .and_then(|rows| rows.rules.into_iter().next())
                        .unwrap_or_default(),
                },
            },
            StepWire::JoinLookup {
                lookup_file_id,
                on,
                lookup_on,
            } => Self::JoinLookup {
                lookup_file_id,
                left_key: on,
                right_key: lookup_on,
            },
            StepWire::AppendFiles => Self::AppendFiles,
        }
    }
}

impl TransformOperation {
    /// Builds the empty operation for a palette template id.
    pub fn from_template_id(id: &str) -> Option<Self> {
        let op = match id {
            "sort_rows" => Self::SortRows {
                columns: Vec::new(),
                ascending: true,
            },
            "rename_columns" => Self::RenameColumns {
                mapping: BTreeMap::new(),
            },
            "rearrange_columns" => Self::RearrangeColumns { order: Vec::new() },
            "remove_duplicates" => Self::RemoveDuplicates {
                columns: Vec::new(),
            },
            "remove_columns" => Self::RemoveColumns {
                columns: Vec::new(),
            },
            "delete_rows" => Self::DeleteRows {
                filter: FilterConfig::default(),
            },
            "join_lookup" => Self::JoinLookup {
                lookup_file_id: None,
                left_key: String::new(),
                right_key: String::new(),
            },
            "append_files" => Self::AppendFiles,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SortRows { .. } => "Sort rows",
            Self::RenameColumns { .. } => "Rename columns",
            Self::RearrangeColumns { .. } => "Rearrange columns",
            Self::RemoveDuplicates { .. } => "Remove duplicates",
            Self::RemoveColumns { .. } => "Remove columns",
            Self::DeleteRows { .. } => "Delete rows",
            Self::JoinLookup { .. } => "Join lookup",
            Self::AppendFiles => "Append files",
        }
    }

    pub fn validate(&self) -> Result<()> {
        let missing = |what: &str| -> Result<()> {
            Err(SheetpilotError::Validation(format!("{what} is required")))
        };
        match self {
            Self::SortRows { columns, .. } if columns.is_empty() => missing("A sort column"),
            Self::RenameColumns { mapping } if mapping.is_empty() => missing("A column mapping"),
            Self::RearrangeColumns { order } if order.is_empty() => missing("A column order"),
            Self::RemoveColumns { columns } if columns.is_empty() => missing("A column"),
            Self::DeleteRows { filter } => filter.validate(),
            Self::JoinLookup {
                lookup_file_id,
                left_key,
                right_key,
            } => {
                if lookup_file_id.is_none() {
                    missing("Lookup file")
                } else if left_key.trim().is_empty() || right_key.trim().is_empty() {
                    missing("Both join keys")
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

/// How a transform maps its source files onto destination targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    #[default]
    OneToOne,
    ManyToOne,
    ManyToMany,
    GroupToGroup,
    GroupToMany,
}

impl TargetMode {
    pub const ALL: [Self; 5] = [
        Self::OneToOne,
        Self::ManyToOne,
        Self::ManyToMany,
        Self::GroupToGroup,
        Self::GroupToMany,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::OneToOne => "One to one",
            Self::ManyToOne => "Many to one (merge)",
            Self::ManyToMany => "Many to many",
            Self::GroupToGroup => "Group to group",
            Self::GroupToMany => "Group to many (merge)",
        }
    }

    /// Modes that read grouped (batch) files rather than individual ones.
    pub fn uses_groups(self) -> bool {
        matches!(self, Self::GroupToGroup | Self::GroupToMany)
    }

    /// Modes that write every source into a single output file.
    pub fn merges(self) -> bool {
        matches!(self, Self::ManyToOne | Self::GroupToMany)
    }
}

/// One addressable output slot of a transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationTarget {
    /// `output:{output_id}:{sheet_name}`
    pub virtual_id: String,
    pub output_id: String,
    pub file_name: String,
    pub sheet_name: String,
    pub source_file_id: i64,
    /// Originating batch; `None` for individual files
    pub batch_id: Option<i64>,
}

/// A transform node's data. The operation supplies `blockType` and `config`;
/// target planning sits beside them under keys the backend ignores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(flatten)]
    pub operation: TransformOperation,
    #[serde(rename = "targetMode", default)]
    pub mode: TargetMode,
    #[serde(default)]
    pub targets: Vec<DestinationTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSheet {
    pub sheet_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    pub id: String,
    pub file_name: String,
    #[serde(default)]
    pub sheets: Vec<OutputSheet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub outputs: Vec<OutputFile>,
}

/// Per-kind configuration stored in a node's data payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BlockWire", from = "BlockWire")]
pub enum BlockConfig {
    Source,
    Upload {
        file_ids: Vec<i64>,
        batch_ids: Vec<i64>,
    },
    Filter {
        config: FilterConfig,
    },
    Transform {
        config: TransformConfig,
    },
    Output {
        output: OutputConfig,
    },
}

/// Blocks whose `blockType` is fixed by their kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "blockType", rename_all = "snake_case")]
enum KindBlock {
    Source,
    Upload {
        #[serde(rename = "fileIds", default)]
        file_ids: Vec<i64>,
        #[serde(rename = "batchIds", default)]
        batch_ids: Vec<i64>,
    },
    FilterRows {
        config: FilterConfig,
    },
    Output {
        #[serde(default)]
        output: OutputConfig,
    },
}

/// Transform steps are tagged by operation, everything else by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum BlockWire {
    Kind(KindBlock),
    Step(TransformConfig),
}

impl From<BlockConfig> for BlockWire {
    fn from(block: BlockConfig) -> Self {
        match block {
            BlockConfig::Source => Self::Kind(KindBlock::Source),
            BlockConfig::Upload {
                file_ids,
                batch_ids,
            } => Self::Kind(KindBlock::Upload {
                file_ids,
                batch_ids,
            }),
            BlockConfig::Filter { config } => Self::Kind(KindBlock::FilterRows { config }),
            BlockConfig::Transform { config } => Self::Step(config),
            BlockConfig::Output { output } => Self::Kind(KindBlock::Output { output }),
        }
    }
}

impl From<BlockWire> for BlockConfig {
    fn from(wire: BlockWire) -> Self {
        match wire {
            BlockWire::Kind(KindBlock::Source) => Self::Source,
            BlockWire::Kind(KindBlock::Upload {
                file_ids,
                batch_ids,
            }) => Self::Upload {
                file_ids,
                batch_ids,
            },
            BlockWire::Kind(KindBlock::FilterRows { config }) => Self::Filter { config },
            BlockWire::Kind(KindBlock::Output { output }) => Self::Output { output },
            BlockWire::Step(config) => Self::Transform { config },
        }
    }
}

impl BlockConfig {
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Source => BlockKind::Source,
            Self::Upload { .. } => BlockKind::Upload,
            Self::Filter { .. } => BlockKind::Filter,
            Self::Transform { .. } => BlockKind::Transform,
            Self::Output { .. } => BlockKind::Output,
        }
    }

    /// Initial configuration for a block dropped from the palette.
    pub fn from_template(template: &BlockTemplate) -> Result<Self> {
        let config = match template.kind {
            BlockKind::Source => Self::Source,
            BlockKind::Upload => Self::Upload {
                file_ids: Vec::new(),
                batch_ids: Vec::new(),
            },
            BlockKind::Filter => Self::Filter {
                config: FilterConfig::default(),
            },
            BlockKind::Transform => {
                let operation = TransformOperation::from_template_id(&template.id)
                    .ok_or_else(|| {
                        SheetpilotError::Parse(format!(
                            "Unknown transform template '{}'",
                            template.id
                        ))
                    })?;
                Self::Transform {
                    config: TransformConfig {
                        operation,
                        mode: TargetMode::default(),
                        targets: Vec::new(),
                    },
                }
            }
            BlockKind::Output => Self::Output {
                output: OutputConfig::default(),
            },
        };
        Ok(config)
    }

    /// Checks the configuration before it is sent to the backend.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Filter { config } => config.validate(),
            Self::Transform { config } => config.operation.validate(),
            Self::Source | Self::Upload { .. } | Self::Output { .. } => Ok(()),
        }
    }

    pub fn file_ids(&self) -> &[i64] {
        match self {
            Self::Upload { file_ids, .. } => file_ids,
            _ => &[],
        }
    }
}

/// A draggable palette entry; also the drag-and-drop wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTemplate {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub id: String,
    pub label: String,
}

impl BlockTemplate {
    pub fn new(kind: BlockKind, id: &str, label: &str) -> Self {
        Self {
            kind,
            id: id.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// Blocks offered in the sidebar palette, in display order.
pub fn palette() -> Vec<BlockTemplate> {
    vec![
        BlockTemplate::new(BlockKind::Upload, "upload", "Upload files"),
        BlockTemplate::new(BlockKind::Filter, "filter_rows", "Filter rows"),
        BlockTemplate::new(BlockKind::Transform, "sort_rows", "Sort rows"),
        BlockTemplate::new(BlockKind::Transform, "rename_columns", "Rename columns"),
        BlockTemplate::new(BlockKind::Transform, "rearrange_columns", "Rearrange columns"),
        BlockTemplate::new(BlockKind::Transform, "remove_duplicates", "Remove duplicates"),
        BlockTemplate::new(BlockKind::Transform, "remove_columns", "Remove columns"),
        BlockTemplate::new(BlockKind::Transform, "delete_rows", "Delete rows"),
        BlockTemplate::new(BlockKind::Transform, "join_lookup", "Join lookup"),
        BlockTemplate::new(BlockKind::Transform, "append_files", "Append files"),
        BlockTemplate::new(BlockKind::Output, "output", "Output"),
    ]
}
