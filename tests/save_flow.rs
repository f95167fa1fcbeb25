//! Saving flows through the store's snapshot workflow.

mod common;

use common::MockBackend;
use sheetpilot::api::FlowApi as _;
use sheetpilot::model::{BlockConfig, FilterConfig, Node, Position};
use sheetpilot::store::{FlowCommand, FlowStore, save_flow};

fn add_filter(store: &mut FlowStore) -> String {
    let node = Node::new(
        BlockConfig::Filter {
            config: FilterConfig::default(),
        },
        "Filter rows",
        Position::new(300.0, 200.0),
    );
    let id = node.id.clone();
    assert!(store.dispatch(FlowCommand::AddNode(node)));
    id
}

#[tokio::test]
async fn test_first_save_creates_then_updates() {
    let backend = MockBackend::new();
    let mut store = FlowStore::new();
    store.dispatch(FlowCommand::Rename("Monthly report".to_owned()));
    add_filter(&mut store);

    let snapshot = store.begin_save();
    assert!(store.is_saving());
    let outcome = save_flow(&backend, &snapshot).await;
    store.finish_save(snapshot.revision, &outcome);

    let created = outcome.expect("created");
    assert_eq!(store.flow_id(), Some(created.id));
    assert!(!store.is_dirty());
    assert_eq!(store.save_button().label, "Saved");
    assert_eq!(backend.calls_starting_with("create_flow Monthly report"), 1);

    add_filter(&mut store);
    assert_eq!(store.save_button().label, "Update Flow");
    let snapshot = store.begin_save();
    let outcome = save_flow(&backend, &snapshot).await;
    store.finish_save(snapshot.revision, &outcome);

    assert!(outcome.is_ok());
    assert_eq!(backend.calls_starting_with(&format!("update_flow {}", created.id)), 1);
    assert_eq!(backend.calls_starting_with("create_flow"), 1);

    let stored = backend.get_flow(created.id).await.expect("stored flow");
    assert_eq!(stored.flow_data.nodes.len(), 3, "source plus two filters");
    assert_eq!(stored.flow_data, store.flow_data());
}

#[tokio::test]
async fn test_edit_during_save_keeps_flow_dirty() {
    let backend = MockBackend::new();
    let mut store = FlowStore::new();
    store.dispatch(FlowCommand::Rename("Draft".to_owned()));

    let snapshot = store.begin_save();
    add_filter(&mut store);
    let outcome = save_flow(&backend, &snapshot).await;
    store.finish_save(snapshot.revision, &outcome);

    assert!(store.flow_id().is_some());
    assert!(store.is_dirty());
    assert_eq!(store.save_button().label, "Update Flow");
}

#[tokio::test]
async fn test_failed_save_leaves_flow_unsaved() {
    let backend = MockBackend::new();
    backend.fail_saves();
    let mut store = FlowStore::new();
    store.dispatch(FlowCommand::Rename("Broken".to_owned()));

    let snapshot = store.begin_save();
    let outcome = save_flow(&backend, &snapshot).await;
    store.finish_save(snapshot.revision, &outcome);

    assert!(outcome.is_err());
    assert_eq!(store.flow_id(), None);
    assert!(!store.is_saving());
    assert!(store.save_button().enabled, "the user can retry");
    assert!(backend.flows().is_empty());
}

#[tokio::test]
async fn test_reloaded_flow_round_trips_through_backend() {
    let backend = MockBackend::new();
    let mut store = FlowStore::new();
    store.dispatch(FlowCommand::Rename("Roundtrip".to_owned()));
    let filter_id = add_filter(&mut store);
    store.dispatch(FlowCommand::Connect(sheetpilot::model::Edge::new(
        "source",
        filter_id.clone(),
    )));

    let snapshot = store.begin_save();
    let record = save_flow(&backend, &snapshot).await.expect("saved");

    let reloaded = FlowStore::from_record(backend.get_flow(record.id).await.expect("flow"));
    assert_eq!(reloaded.name(), "Roundtrip");
    assert_eq!(reloaded.flow_id(), Some(record.id));
    assert!(reloaded.node(&filter_id).is_some());
    assert_eq!(reloaded.edges().len(), 1);
    assert!(!reloaded.is_dirty());
}
