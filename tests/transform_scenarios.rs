//! Building a flow end to end: upload files, point an upload block at them
//! and plan the transform's destination targets.

mod common;

use common::{MockBackend, csv, xlsx};
use sheetpilot::export::{ZIP_DOWNLOAD_NAME, expected_download_name, output_config_of};
use sheetpilot::model::{
    BlockConfig, BlockKind, BlockTemplate, Edge, Node, OutputConfig, Position, TargetMode,
};
use sheetpilot::store::{FlowCommand, FlowStore};
use sheetpilot::targets::{PlanOptions, plan, retarget};
use sheetpilot::upload::{Notice, UploadSession, UploadTarget};

/// A store holding source → upload → "Sort rows", returning the ids of the
/// upload and transform nodes.
fn flow_with_transform() -> (FlowStore, String, String) {
    let mut store = FlowStore::new();
    let upload = Node::new(
        BlockConfig::Upload {
            file_ids: Vec::new(),
            batch_ids: Vec::new(),
        },
        "Upload files",
        Position::new(250.0, 160.0),
    );
    let template = BlockTemplate::new(BlockKind::Transform, "sort_rows", "Sort rows");
    let transform = Node::new(
        BlockConfig::from_template(&template).expect("known template"),
        "Sort rows",
        Position::new(250.0, 300.0),
    );
    let (upload_id, transform_id) = (upload.id.clone(), transform.id.clone());
    assert!(store.dispatch(FlowCommand::AddNode(upload)));
    assert!(store.dispatch(FlowCommand::AddNode(transform)));
    assert!(store.dispatch(FlowCommand::Connect(Edge::new("source", upload_id.clone()))));
    assert!(store.dispatch(FlowCommand::Connect(Edge::new(
        upload_id.clone(),
        transform_id.clone()
    ))));
    (store, upload_id, transform_id)
}

fn output_of(store: &FlowStore) -> OutputConfig {
    output_config_of(&store.flow_data())
}

fn apply_all(store: &mut FlowStore, commands: Vec<FlowCommand>) {
    for command in commands {
        assert!(store.dispatch(command));
    }
}

#[tokio::test]
async fn test_group_to_group_targets_carry_batch_id() {
    let backend = MockBackend::new();
    let group = backend.add_batch("Regions", Some(1));
    let mut session = UploadSession::new(&backend);
    session.open(Some(1)).await;
    session
        .upload(
            vec![xlsx("north.xlsx"), xlsx("south.xlsx"), csv("west.csv")],
            UploadTarget::Group(group.id),
        )
        .await;
    session.upload(vec![csv("loose.csv")], UploadTarget::Individual).await;

    let files = session.state.all_files();
    let targets =
        plan(TargetMode::GroupToGroup, &files, &PlanOptions::default()).expect("targets");

    assert_eq!(targets.len(), 3);
    assert!(targets.iter().all(|t| t.batch_id == Some(group.id)));
    let names: Vec<&str> = targets.iter().map(|t| t.file_name.as_str()).collect();
    assert_eq!(names, vec!["north.xlsx", "south.xlsx", "west.xlsx"]);
    assert!(
        targets
            .iter()
            .all(|t| t.virtual_id == format!("output:{}:{}", t.output_id, t.sheet_name))
    );
}

#[tokio::test]
async fn test_many_to_many_uses_individual_files_only() {
    let backend = MockBackend::new();
    let group = backend.add_batch("Ignored", Some(1));
    backend.add_file("grouped.xlsx", Some(group.id));
    for name in ["a.csv", "b.csv", "c.xlsx", "d.xls"] {
        backend.add_file(name, None);
    }
    let mut session = UploadSession::new(&backend);
    session.open(Some(1)).await;

    let files = session.state.all_files();
    let targets = plan(TargetMode::ManyToMany, &files, &PlanOptions::default()).expect("targets");

    assert_eq!(targets.len(), 4);
    assert!(targets.iter().all(|t| t.batch_id.is_none()));
    let mut outputs: Vec<&str> = targets.iter().map(|t| t.output_id.as_str()).collect();
    outputs.dedup();
    assert_eq!(outputs.len(), 4, "one output file per source");
}

#[tokio::test]
async fn test_group_to_many_merges_selected_group() {
    let backend = MockBackend::new();
    let q1 = backend.add_batch("Q1", Some(1));
    let q2 = backend.add_batch("Q2", Some(1));
    backend.add_file("jan.xlsx", Some(q1.id));
    backend.add_file("feb.xlsx", Some(q1.id));
    backend.add_file("apr.xlsx", Some(q2.id));
    let mut session = UploadSession::new(&backend);
    session.open(Some(1)).await;

    let options = PlanOptions {
        group_id: Some(q1.id),
        merged_name: Some("first quarter".to_owned()),
    };
    let targets =
        plan(TargetMode::GroupToMany, &session.state.all_files(), &options).expect("targets");

    assert_eq!(targets.len(), 2);
    assert!(targets.iter().all(|t| t.file_name == "first quarter.xlsx"));
    assert!(targets.iter().all(|t| t.output_id == "output-1"));
    assert!(targets.iter().all(|t| t.batch_id == Some(q1.id)));
    let sheets: Vec<&str> = targets.iter().map(|t| t.sheet_name.as_str()).collect();
    assert_eq!(sheets, vec!["jan", "feb"]);
}

#[tokio::test]
async fn test_included_files_feed_upload_block_and_retarget() {
    let backend = MockBackend::new();
    let (mut store, upload_id, transform_id) = flow_with_transform();
    let mut session = UploadSession::new(&backend);
    session.open(None).await;
    session
        .upload(vec![csv("one.csv"), csv("two.csv")], UploadTarget::Individual)
        .await;

    let included = session
        .state
        .drain_notices()
        .into_iter()
        .filter_map(|n| match n {
            Notice::IncludedFiles(ids) => Some(ids),
            _ => None,
        })
        .last()
        .expect("included files emitted");
    assert!(store.dispatch(FlowCommand::SetFileIds {
        id: upload_id.clone(),
        file_ids: included.clone(),
        batch_ids: session.state.group_ids(),
    }));
    assert_eq!(store.flow_data().referenced_file_ids(), included);

    let commands = retarget(
        &store,
        &transform_id,
        TargetMode::ManyToMany,
        &session.state.all_files(),
        &PlanOptions::default(),
    )
    .expect("retarget");
    apply_all(&mut store, commands);

    let output_nodes: Vec<&Node> = store
        .nodes()
        .iter()
        .filter(|n| n.kind == BlockKind::Output)
        .collect();
    assert_eq!(output_nodes.len(), 1);
    let output_id = output_nodes.first().map(|n| n.id.clone()).expect("output node");
    assert!(
        store
            .edges()
            .iter()
            .any(|e| e.source == transform_id && e.target == output_id)
    );
    assert_eq!(output_of(&store).outputs.len(), 2);
    assert_eq!(expected_download_name(&output_of(&store)), ZIP_DOWNLOAD_NAME);

    let commands = retarget(
        &store,
        &transform_id,
        TargetMode::ManyToOne,
        &session.state.all_files(),
        &PlanOptions::default(),
    )
    .expect("retarget again");
    apply_all(&mut store, commands);

    assert_eq!(
        store.nodes().iter().filter(|n| n.kind == BlockKind::Output).count(),
        1,
        "the existing output block is reused"
    );
    assert_eq!(expected_download_name(&output_of(&store)), "merged.xlsx");
    match store.node(&transform_id).map(|n| &n.data.block) {
        Some(BlockConfig::Transform { config }) => {
            assert_eq!(config.mode, TargetMode::ManyToOne);
            assert_eq!(config.targets.len(), 2);
        }
        other => panic!("expected a transform block, got {other:?}"),
    }
}

#[test]
fn test_retarget_rejects_non_transform_nodes() {
    let (store, upload_id, _) = flow_with_transform();
    let files = [common::file_record(1, "a.csv", None)];
    assert!(
        retarget(
            &store,
            &upload_id,
            TargetMode::OneToOne,
            &files,
            &PlanOptions::default()
        )
        .is_err()
    );
}

#[test]
fn test_group_modes_need_grouped_files() {
    let (store, _, transform_id) = flow_with_transform();
    let files = [common::file_record(1, "a.csv", None)];
    let err = retarget(
        &store,
        &transform_id,
        TargetMode::GroupToMany,
        &files,
        &PlanOptions::default(),
    )
    .expect_err("no grouped files");
    assert!(err.user_message("").contains("grouped files"));
}
