//! Destination targets of a transform step.
//!
//! A transform maps its source files onto virtual outputs addressed as
//! `output:{output_id}:{sheet_name}`. The [`TargetMode`] decides which files
//! are eligible (grouped or individual) and whether they are merged into one
//! workbook or written one workbook per source. The output block's
//! configuration is then derived from the planned targets.

use crate::error::{Result, SheetpilotError};
use crate::model::{
    BlockConfig, DestinationTarget, Edge, FileRecord, Node, OutputConfig, OutputFile,
    OutputSheet, Position, TargetMode, TransformConfig,
};
use crate::store::{FlowCommand, FlowStore};
use std::collections::HashSet;

/// Excel's limit on worksheet names.
pub const MAX_SHEET_NAME_LEN: usize = 31;
pub const DEFAULT_MERGED_NAME: &str = "merged.xlsx";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Restricts group modes to one group; `None` uses every grouped file.
    pub group_id: Option<i64>,
    /// Workbook name for merging modes.
    pub merged_name: Option<String>,
}

pub fn virtual_id(output_id: &str, sheet_name: &str) -> String {
    format!("output:{output_id}:{sheet_name}")
}

/// Replaces characters Excel rejects in sheet names and caps the length.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('\'');
    let capped: String = trimmed.chars().take(MAX_SHEET_NAME_LEN).collect();
    if capped.is_empty() {
        "Sheet".to_owned()
    } else {
        capped
    }
}

/// Returns `name`, or `name (n)` shortened to fit, that is not in `taken`.
fn unique_sheet_name(name: &str, taken: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(name);
    if taken.insert(base.to_lowercase()) {
        return base;
    }
    for n in 2.. {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
        let head: String = base.chars().take(keep).collect();
        let candidate = format!("{head}{suffix}");
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
    }
    base
}

fn unique_file_name(stem: &str, taken: &mut HashSet<String>) -> String {
    let stem = if stem.trim().is_empty() { "output" } else { stem.trim() };
    let first = format!("{stem}.xlsx");
    if taken.insert(first.to_lowercase()) {
        return first;
    }
    for n in 2.. {
        let candidate = format!("{stem} ({n}).xlsx");
        if taken.insert(candidate.to_lowercase()) {
            return candidate;
        }
    }
    first
}

fn merged_file_name(options: &PlanOptions) -> String {
    match options.merged_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            if name.to_ascii_lowercase().ends_with(".xlsx") {
                name.to_owned()
            } else {
                format!("{name}.xlsx")
            }
        }
        _ => DEFAULT_MERGED_NAME.to_owned(),
    }
}

/// Files a mode reads: grouped files for group modes, individual files
/// otherwise. One-to-one falls back to any file when there are no
/// individual ones.
pub fn eligible_sources<'a>(
    mode: TargetMode,
    files: &'a [FileRecord],
    options: &PlanOptions,
) -> Vec<&'a FileRecord> {
    let grouped = |f: &&FileRecord| match (f.batch_id, options.group_id) {
        (Some(batch), Some(wanted)) => batch == wanted,
        (Some(_), None) => true,
        (None, _) => false,
    };
    match mode {
        TargetMode::GroupToGroup | TargetMode::GroupToMany => {
            files.iter().filter(grouped).collect()
        }
        TargetMode::ManyToOne | TargetMode::ManyToMany => {
            files.iter().filter(|f| f.batch_id.is_none()).collect()
        }
        TargetMode::OneToOne => files
            .iter()
            .find(|f| f.batch_id.is_none())
            .or_else(|| files.first())
            .into_iter()
            .collect(),
    }
}

/// Plans the destination targets of a transform over `files`.
pub fn plan(
    mode: TargetMode,
    files: &[FileRecord],
    options: &PlanOptions,
) -> Result<Vec<DestinationTarget>> {
    let sources = eligible_sources(mode, files, options);
    if sources.is_empty() {
        let what = if mode.uses_groups() {
            "grouped files"
        } else {
            "files"
        };
        return Err(SheetpilotError::Validation(format!(
            "{} needs {what} to work on; upload some first",
            mode.label()
        )));
    }

    let tag_batch = mode.uses_groups() || mode == TargetMode::OneToOne;
    let mut sheet_names = HashSet::new();
    let mut file_names = HashSet::new();
    let merged_name = merged_file_name(options);

    let targets = sources
        .iter()
        .enumerate()
        .map(|(idx, file)| {
            let (output_id, file_name) = if mode.merges() {
                ("output-1".to_owned(), merged_name.clone())
            } else {
                (
                    format!("output-{}", idx + 1),
                    unique_file_name(file.stem(), &mut file_names),
                )
            };
            let sheet_name = if mode.merges() {
                unique_sheet_name(file.stem(), &mut sheet_names)
            } else {
                sanitize_sheet_name(file.stem())
            };
            DestinationTarget {
                virtual_id: virtual_id(&output_id, &sheet_name),
                output_id,
                file_name,
                sheet_name,
                source_file_id: file.id,
                batch_id: if tag_batch { file.batch_id } else { None },
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(mode = mode.label(), targets = targets.len(), "Targets planned");
    Ok(targets)
}

/// Output block configuration materializing `targets`, one output file per
/// distinct output id in first-seen order.
pub fn output_config(targets: &[DestinationTarget]) -> OutputConfig {
    let mut outputs: Vec<OutputFile> = Vec::new();
    for target in targets {
        let sheet = OutputSheet {
            sheet_name: target.sheet_name.clone(),
        };
        match outputs.iter_mut().find(|o| o.id == target.output_id) {
            Some(output) => {
                if !output.sheets.contains(&sheet) {
                    output.sheets.push(sheet);
                }
            }
            None => outputs.push(OutputFile {
                id: target.output_id.clone(),
                file_name: target.file_name.clone(),
                sheets: vec![sheet],
            }),
        }
    }
    OutputConfig { outputs }
}

/// Store commands that set `mode` on the transform node `transform_id` and
/// rewrite the output block to match. An output block is created below the
/// transform and connected when the flow has none.
pub fn retarget(
    store: &FlowStore,
    transform_id: &str,
    mode: TargetMode,
    files: &[FileRecord],
    options: &PlanOptions,
) -> Result<Vec<FlowCommand>> {
    let node = store
        .node(transform_id)
        .ok_or_else(|| SheetpilotError::Other(format!("No node '{transform_id}'")))?;
    let BlockConfig::Transform { config } = &node.data.block else {
        return Err(SheetpilotError::Validation(
            "Targets can only be set on a transform block".to_owned(),
        ));
    };

    let targets = plan(mode, files, options)?;
    let output = output_config(&targets);
    let mut commands = vec![FlowCommand::UpdateConfig {
        id: transform_id.to_owned(),
        config: BlockConfig::Transform {
            config: TransformConfig {
                operation: config.operation.clone(),
                mode,
                targets,
            },
        },
    }];

    let output_nodes: Vec<&Node> = store
        .nodes()
        .iter()
        .filter(|n| matches!(n.data.block, BlockConfig::Output { .. }))
        .collect();
    if output_nodes.is_empty() {
        let position = Position::new(node.position.x, node.position.y + 140.0);
        let output_node = Node::new(BlockConfig::Output { output }, "Output", position);
        let edge = Edge::new(transform_id, output_node.id.clone());
        commands.push(FlowCommand::AddNode(output_node));
        commands.push(FlowCommand::Connect(edge));
    } else {
        for output_node in output_nodes {
            commands.push(FlowCommand::UpdateConfig {
                id: output_node.id.clone(),
                config: BlockConfig::Output {
                    output: output.clone(),
                },
            });
        }
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: i64, name: &str, batch_id: Option<i64>) -> FileRecord {
        FileRecord {
            id,
            filename: format!("stored-{id}"),
            original_filename: name.to_owned(),
            file_size: 1,
            mime_type: "text/csv".to_owned(),
            created_at: None,
            batch_id,
        }
    }

    #[test]
    fn test_sheet_names_are_capped_and_deduplicated() {
        let long = "a".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).chars().count(), MAX_SHEET_NAME_LEN);
        assert_eq!(sanitize_sheet_name("Q1/Q2 [draft]"), "Q1_Q2 _draft_");

        let mut taken = HashSet::new();
        let first = unique_sheet_name(&long, &mut taken);
        let second = unique_sheet_name(&long, &mut taken);
        assert_ne!(first, second);
        assert!(second.ends_with(" (2)"));
        assert_eq!(second.chars().count(), MAX_SHEET_NAME_LEN);
    }

    #[test]
    fn test_one_to_one_prefers_individual_file() {
        let files = [file(1, "grouped.csv", Some(4)), file(2, "single.csv", None)];
        let targets = plan(TargetMode::OneToOne, &files, &PlanOptions::default())
            .expect("one target");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets.first().map(|t| t.source_file_id), Some(2));
    }

    #[test]
    fn test_many_to_one_merges_into_one_output() {
        let files = [
            file(1, "sales.csv", None),
            file(2, "sales.xlsx", None),
            file(3, "costs.csv", Some(9)),
        ];
        let options = PlanOptions {
            merged_name: Some("combined".to_owned()),
            ..PlanOptions::default()
        };
        let targets = plan(TargetMode::ManyToOne, &files, &options).expect("targets");
        assert_eq!(targets.len(), 2);
        assert!(targets.iter().all(|t| t.file_name == "combined.xlsx"));
        assert!(targets.iter().all(|t| t.batch_id.is_none()));
        let sheets: Vec<&str> = targets.iter().map(|t| t.sheet_name.as_str()).collect();
        assert_eq!(sheets, vec!["sales", "sales (2)"]);

        let output = output_config(&targets);
        assert_eq!(output.outputs.len(), 1);
        assert_eq!(output.outputs.first().map(|o| o.sheets.len()), Some(2));
    }

    #[test]
    fn test_group_mode_without_groups_is_rejected() {
        let files = [file(1, "a.csv", None)];
        assert!(matches!(
            plan(TargetMode::GroupToGroup, &files, &PlanOptions::default()),
            Err(SheetpilotError::Validation(_))
        ));
    }

    #[test]
    fn test_group_filter() {
        let files = [file(1, "a.csv", Some(1)), file(2, "b.csv", Some(2))];
        let options = PlanOptions {
            group_id: Some(2),
            ..PlanOptions::default()
        };
        let targets = plan(TargetMode::GroupToGroup, &files, &options).expect("targets");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets.first().and_then(|t| t.batch_id), Some(2));
        assert_eq!(
            targets.first().map(|t| t.virtual_id.as_str()),
            Some("output:output-1:b")
        );
    }

    #[test]
    fn test_retarget_creates_output_block() {
        let mut store = FlowStore::new();
        let template = crate::model::BlockTemplate::new(
            crate::model::BlockKind::Transform,
            "sort_rows",
            "Sort rows",
        );
        let node = Node::new(
            BlockConfig::from_template(&template).expect("known template"),
            "Sort rows",
            Position::new(100.0, 100.0),
        );
        let id = node.id.clone();
        store.dispatch(FlowCommand::AddNode(node));

        let files = [file(1, "a.csv", None), file(2, "b.csv", None)];
        let commands = retarget(
            &store,
            &id,
            TargetMode::ManyToMany,
            &files,
            &PlanOptions::default(),
        )
        .expect("commands");
        for command in commands {
            assert!(store.dispatch(command));
        }
        let output = store
            .nodes()
            .iter()
            .find_map(|n| match &n.data.block {
                BlockConfig::Output { output } => Some(output.clone()),
                _ => None,
            })
            .expect("output block created");
        assert_eq!(output.outputs.len(), 2);
        assert_eq!(store.edges().len(), 1);
    }
}
