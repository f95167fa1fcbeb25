//! Exporting a flow and saving the download to disk.

mod common;

use common::MockBackend;
use sheetpilot::api::ExportedFile;
use sheetpilot::error::SheetpilotError;
use sheetpilot::export::{export_flow, save_export, unique_path};
use sheetpilot::model::{BlockConfig, FlowData, Node, Position, TargetMode};
use sheetpilot::store::{FlowCommand, FlowStore};
use sheetpilot::targets::{PlanOptions, output_config, plan};

/// Flow data with an upload block over `files` and an output block planned
/// with `mode`.
fn planned_flow(files: &[sheetpilot::model::FileRecord], mode: TargetMode) -> FlowData {
    let mut store = FlowStore::new();
    let upload = Node::new(
        BlockConfig::Upload {
            file_ids: files.iter().map(|f| f.id).collect(),
            batch_ids: files.iter().filter_map(|f| f.batch_id).collect(),
        },
        "Upload files",
        Position::new(250.0, 160.0),
    );
    let targets = plan(mode, files, &PlanOptions::default()).expect("targets");
    let output = Node::new(
        BlockConfig::Output {
            output: output_config(&targets),
        },
        "Output",
        Position::new(250.0, 400.0),
    );
    store.dispatch(FlowCommand::AddNode(upload));
    store.dispatch(FlowCommand::AddNode(output));
    store.flow_data()
}

#[tokio::test]
async fn test_many_to_many_downloads_zip() {
    let backend = MockBackend::new();
    let files = vec![
        backend.add_file("a.csv", None),
        backend.add_file("b.csv", None),
    ];
    let dir = tempfile::tempdir().expect("tempdir");

    let flow = planned_flow(&files, TargetMode::ManyToMany);
    let path = export_flow(&backend, &flow, dir.path()).await.expect("exported");

    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("outputs.zip"));
    assert!(path.exists());
    assert_eq!(backend.calls_starting_with("export"), 1);
}

#[tokio::test]
async fn test_merged_group_downloads_single_workbook() {
    let backend = MockBackend::new();
    let group = backend.add_batch("Q1", Some(1));
    let files = vec![
        backend.add_file("jan.xlsx", Some(group.id)),
        backend.add_file("feb.xlsx", Some(group.id)),
    ];
    let dir = tempfile::tempdir().expect("tempdir");

    let flow = planned_flow(&files, TargetMode::GroupToMany);
    let path = export_flow(&backend, &flow, dir.path()).await.expect("exported");

    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("merged.xlsx"));
}

#[tokio::test]
async fn test_repeated_export_does_not_overwrite() {
    let backend = MockBackend::new();
    let files = vec![backend.add_file("only.csv", None)];
    let dir = tempfile::tempdir().expect("tempdir");
    let flow = planned_flow(&files, TargetMode::OneToOne);

    let first = export_flow(&backend, &flow, dir.path()).await.expect("first");
    let second = export_flow(&backend, &flow, dir.path()).await.expect("second");

    assert_eq!(first.file_name().and_then(|n| n.to_str()), Some("only.xlsx"));
    assert_eq!(second.file_name().and_then(|n| n.to_str()), Some("only (1).xlsx"));
    assert!(first.exists() && second.exists());
}

#[tokio::test]
async fn test_export_without_files_is_rejected() {
    let backend = MockBackend::new();
    let dir = tempfile::tempdir().expect("tempdir");

    let err = export_flow(&backend, &FlowData::default(), dir.path())
        .await
        .expect_err("nothing to export");

    assert!(matches!(err, SheetpilotError::Validation(_)));
    assert_eq!(backend.calls_starting_with("export"), 0);
    assert!(std::fs::read_dir(dir.path()).expect("read dir").next().is_none());
}

#[test]
fn test_save_export_strips_path_components() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = ExportedFile {
        file_name: "../../etc/report.xlsx".to_owned(),
        bytes: b"data".to_vec(),
    };

    let path = save_export(&dir.path().join("nested"), &file).expect("saved");

    assert_eq!(path, dir.path().join("nested").join("report.xlsx"));
    assert_eq!(std::fs::read(&path).expect("written"), b"data");
}

#[test]
fn test_unique_path_counts_up() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("out.xlsx"), b"1").expect("write");
    std::fs::write(dir.path().join("out (1).xlsx"), b"2").expect("write");

    assert_eq!(unique_path(dir.path(), "out.xlsx"), dir.path().join("out (2).xlsx"));
    assert_eq!(unique_path(dir.path(), "fresh.xlsx"), dir.path().join("fresh.xlsx"));
}
