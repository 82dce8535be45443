mod common;

use std::path::PathBuf;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{Harness, Workspace};
use navgraph::events::EditorEvent;
use navgraph::layout::groups::{COMPACT_HEIGHT, COMPACT_WIDTH, PLUGIN_MIN_WIDTH};
use navgraph::model::{
    EdgeType, GraphStore, GroupType, JsonFileStore, Position, STATE_KEY, ViewMode, group_id_for,
};
use navgraph::util::node_id_for_path;

async fn focus(harness: &mut Harness, pick: impl Fn(&Workspace) -> PathBuf) {
    let path = pick(&harness.workspace);
    harness.tracker.handle_event(EditorEvent::Focus { path }).await;
}

async fn close(harness: &mut Harness, pick: impl Fn(&Workspace) -> PathBuf) {
    let path = pick(&harness.workspace);
    harness.tracker.handle_event(EditorEvent::Close { path }).await;
}

async fn set_mode(harness: &mut Harness, mode: &str) {
    harness
        .tracker
        .handle_event(EditorEvent::Mode {
            mode: mode.to_owned(),
        })
        .await;
}

#[tokio::test]
async fn opening_a_dependency_promotes_its_placeholder() {
    let mut harness = Harness::new().await;
    let bar_id = group_id_for("bar");

    focus(&mut harness, Workspace::a).await;
    let placeholder = harness.tracker.state().group(&bar_id).unwrap().clone();
    assert_eq!(placeholder.group_type, GroupType::Dependency);
    assert_eq!(placeholder.label, "@kbn/bar-plugin");
    assert_eq!((placeholder.width, placeholder.height), (COMPACT_WIDTH, COMPACT_HEIGHT));

    focus(&mut harness, Workspace::b).await;
    let state = harness.tracker.state();
    assert_eq!(state.groups.iter().filter(|group| group.id == bar_id).count(), 1);
    let promoted = state.group(&bar_id).unwrap();
    assert_eq!(promoted.group_type, GroupType::Plugin);
    assert_eq!(promoted.plugin_path.as_deref(), Some("plugins/bar"));
    assert_eq!(promoted.required_plugins, Some(Vec::new()));
    assert!(promoted.width >= PLUGIN_MIN_WIDTH);
    assert_eq!(state.file_count(&bar_id), 1);
}

#[tokio::test]
async fn closing_everything_demotes_then_deletes() {
    let mut harness = Harness::new().await;
    let foo_id = group_id_for("foo");
    let bar_id = group_id_for("bar");

    focus(&mut harness, Workspace::a).await;
    focus(&mut harness, Workspace::b).await;

    close(&mut harness, Workspace::b).await;
    let state = harness.tracker.state();
    let demoted = state.group(&bar_id).unwrap();
    assert_eq!(demoted.group_type, GroupType::Dependency);
    assert_eq!((demoted.width, demoted.height), (COMPACT_WIDTH, COMPACT_HEIGHT));
    assert_eq!(demoted.plugin_path, None);
    assert_eq!(demoted.required_plugins, None);
    assert!(
        state
            .edges
            .iter()
            .any(|edge| edge.edge_type == EdgeType::Dependency && edge.source == bar_id)
    );

    close(&mut harness, Workspace::a).await;
    let state = harness.tracker.state();
    assert!(state.group(&foo_id).is_none());
    assert!(state.group(&bar_id).is_none());
    assert!(state.nodes.is_empty());
    assert!(state.edges.is_empty());
}

#[tokio::test]
async fn shared_dependencies_survive_one_dependent_leaving() {
    let mut harness = Harness::new().await;
    let bar_id = group_id_for("bar");

    focus(&mut harness, Workspace::a).await;
    focus(&mut harness, Workspace::c).await;
    focus(&mut harness, Workspace::b).await;
    close(&mut harness, Workspace::b).await;
    close(&mut harness, Workspace::a).await;

    let state = harness.tracker.state();
    assert!(state.group(&group_id_for("foo")).is_none());
    assert_eq!(state.group(&bar_id).unwrap().group_type, GroupType::Dependency);
    assert_eq!(
        state.group(&group_id_for("baz")).unwrap().group_type,
        GroupType::Plugin
    );
    let dependency_edges = state
        .edges
        .iter()
        .filter(|edge| edge.edge_type == EdgeType::Dependency)
        .map(|edge| (edge.source.clone(), edge.target.clone()))
        .collect::<Vec<_>>();
    assert_eq!(dependency_edges, vec![(bar_id, group_id_for("baz"))]);
}

#[tokio::test]
async fn top_level_groups_never_overlap() {
    let mut harness = Harness::new().await;
    focus(&mut harness, Workspace::a).await;
    focus(&mut harness, Workspace::c).await;
    focus(&mut harness, Workspace::b).await;
    focus(&mut harness, |workspace| workspace.path("scripts/loose.ts")).await;

    let groups = &harness.tracker.state().groups;
    for (index, first) in groups.iter().enumerate() {
        for second in &groups[index + 1..] {
            let overlap = first.rect().intersect(second.rect());
            assert!(
                overlap.width() <= 1.0 || overlap.height() <= 1.0,
                "{} overlaps {}",
                first.id,
                second.id
            );
        }
    }
}

#[tokio::test]
async fn dragging_a_group_onto_another_pushes_them_apart() {
    let mut harness = Harness::new().await;
    let foo_id = group_id_for("foo");
    let bar_id = group_id_for("bar");
    focus(&mut harness, Workspace::a).await;

    let target = harness.tracker.state().group(&foo_id).unwrap().position;
    assert!(harness.tracker.move_group(&bar_id, target));
    assert!(!harness.tracker.move_group("group-missing", target));

    let state = harness.tracker.state();
    let overlap = state
        .group(&foo_id)
        .unwrap()
        .rect()
        .intersect(state.group(&bar_id).unwrap().rect());
    assert!(overlap.width() <= 1.0 || overlap.height() <= 1.0);
}

#[tokio::test]
async fn dragging_a_lone_file_keeps_the_dropped_position() {
    let mut harness = Harness::new().await;
    focus(&mut harness, Workspace::a).await;
    let a_id = node_id_for_path(&harness.workspace.a());

    let dropped = Position::new(16.0, 120.0);
    assert!(harness.tracker.move_node(&a_id, dropped));
    assert!(!harness.tracker.move_node("file-missing", dropped));
    assert_eq!(harness.tracker.state().node(&a_id).unwrap().position, dropped);
}

#[tokio::test]
async fn mode_switches_prune_and_restore_placeholders() {
    let mut harness = Harness::new().await;
    let bar_id = group_id_for("bar");
    focus(&mut harness, Workspace::a).await;

    set_mode(&mut harness, "journey").await;
    assert_eq!(harness.tracker.state().view_mode, ViewMode::Journey);
    assert!(harness.tracker.state().group(&bar_id).is_none());

    set_mode(&mut harness, "plugin").await;
    assert_eq!(harness.tracker.state().view_mode, ViewMode::Plugin);
    assert_eq!(
        harness.tracker.state().group(&bar_id).unwrap().group_type,
        GroupType::Dependency
    );

    set_mode(&mut harness, "sideways").await;
    assert_eq!(harness.tracker.state().view_mode, ViewMode::Plugin);
}

#[tokio::test]
async fn projections_differ_by_mode_and_never_dangle() {
    let mut harness = Harness::new().await;
    focus(&mut harness, Workspace::a).await;

    let journey = harness.tracker.projection(ViewMode::Journey);
    assert_eq!(
        journey.groups.iter().map(|group| group.id.as_str()).collect::<Vec<_>>(),
        vec![group_id_for("foo").as_str()]
    );
    assert!(journey.edges.iter().all(|edge| edge.edge_type != EdgeType::Dependency));

    let plugin = harness.tracker.projection(ViewMode::Plugin);
    assert_eq!(plugin.groups.len(), 2);

    let complete = harness.tracker.projection(ViewMode::Complete);
    let mut ids = complete
        .groups
        .iter()
        .map(|group| group.id.clone())
        .collect::<Vec<_>>();
    ids.sort();
    assert_eq!(ids, vec![group_id_for("bar"), group_id_for("baz"), group_id_for("foo")]);
    assert_eq!(
        complete
            .edges
            .iter()
            .filter(|edge| edge.edge_type == EdgeType::Dependency)
            .count(),
        2
    );

    for projection in [&journey, &plugin, &complete] {
        for edge in &projection.edges {
            assert!(projection.group(&edge.source).is_some() || projection.node(&edge.source).is_some());
            assert!(projection.group(&edge.target).is_some() || projection.node(&edge.target).is_some());
        }
    }
}

#[tokio::test]
async fn clear_command_closes_documents_and_keeps_the_mode() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let b = harness.workspace.b();
    focus(&mut harness, Workspace::a).await;
    focus(&mut harness, Workspace::b).await;
    set_mode(&mut harness, "complete").await;

    harness
        .tracker
        .handle_event(EditorEvent::Command {
            command: "clearGraph".to_owned(),
        })
        .await;

    let mut closed = harness.host.closed();
    closed.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(closed, expected);

    let state = harness.tracker.state();
    assert!(state.is_empty());
    assert_eq!(state.view_mode, ViewMode::Complete);
    assert_eq!(harness.tracker.previous_file(), None);
    assert_eq!(harness.tracker.active_node_id(), None);
}

#[tokio::test]
async fn state_survives_a_restart() {
    let state_dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(JsonFileStore::new(state_dir.path()));
    let mut harness = Harness::with_backend(Workspace::new(), backend.clone()).await;

    focus(&mut harness, Workspace::a).await;
    focus(&mut harness, Workspace::b).await;
    set_mode(&mut harness, "plugin").await;

    assert!(state_dir.path().join(format!("{STATE_KEY}.json")).is_file());
    let reloaded = GraphStore::load(backend);
    assert_eq!(reloaded.state(), harness.tracker.state());
    assert_eq!(reloaded.state().view_mode, ViewMode::Plugin);
}
