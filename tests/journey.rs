mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{Harness, function_symbol};
use navgraph::events::{EditorEvent, Notice};
use navgraph::host::{TextPosition, TextRange};
use navgraph::model::{EdgeType, GroupType, SymbolRef, group_id_for};
use navgraph::util::node_id_for_path;

fn touch_do_thing(harness: &Harness) -> EditorEvent {
    EditorEvent::caret(harness.workspace.a(), TextPosition::new(3, 10), "  return doThing();")
}

#[tokio::test]
async fn jump_through_an_identifier_annotates_both_files() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let b = harness.workspace.b();
    harness
        .host
        .set_outline(&a, vec![function_symbol("render", (2, 4))]);

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: a.clone() })
        .await;
    let event = touch_do_thing(&harness);
    harness.tracker.handle_event(event).await;
    harness.tracker.wait_for_symbol_lookup().await;
    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: b.clone() })
        .await;

    let state = harness.tracker.state();
    let a_id = node_id_for_path(&a);
    let b_id = node_id_for_path(&b);

    let b_node = state.node(&b_id).unwrap();
    assert_eq!(b_node.symbols, vec![SymbolRef::new("doThing", 3, &a)]);
    assert_eq!(b_node.group_id.as_deref(), Some(group_id_for("bar").as_str()));
    assert_eq!(b_node.plugin_name.as_deref(), Some("@kbn/bar-plugin"));
    assert_eq!(b_node.relative_path, "public");

    let a_node = state.node(&a_id).unwrap();
    assert_eq!(a_node.source_symbols, vec![SymbolRef::new("render", 2, &a)]);
    assert!(a_node.symbols.is_empty());

    let navigation = state
        .edges
        .iter()
        .filter(|edge| edge.edge_type == EdgeType::Navigation)
        .collect::<Vec<_>>();
    assert_eq!(navigation.len(), 1);
    assert_eq!((navigation[0].source.as_str(), navigation[0].target.as_str()), (a_id.as_str(), b_id.as_str()));

    let foo = state.group(&group_id_for("foo")).unwrap();
    let bar = state.group(&group_id_for("bar")).unwrap();
    assert_eq!(foo.group_type, GroupType::Plugin);
    assert_eq!(bar.group_type, GroupType::Plugin);
    assert!(state.edges.iter().any(|edge| {
        edge.edge_type == EdgeType::Dependency
            && edge.source == bar.id
            && edge.target == foo.id
    }));

    assert_eq!(harness.tracker.active_node_id(), Some(b_id.as_str()));
    assert!(harness.tracker.is_highlighted(&b_id));
    assert!(harness.tracker.pending_symbol().is_none());
}

#[tokio::test]
async fn leaving_before_the_outline_arrives_tags_only_the_destination() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let b = harness.workspace.b();
    harness
        .host
        .set_outline(&a, vec![function_symbol("render", (2, 4))]);
    let gate = harness.host.hold_outlines();

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: a.clone() })
        .await;
    let event = touch_do_thing(&harness);
    harness.tracker.handle_event(event).await;
    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: b.clone() })
        .await;
    gate.notify_one();
    harness.tracker.wait_for_symbol_lookup().await;

    let state = harness.tracker.state();
    let a_id = node_id_for_path(&a);
    let b_id = node_id_for_path(&b);
    assert_eq!(
        state.node(&b_id).unwrap().symbols,
        vec![SymbolRef::new("doThing", 3, &a)]
    );
    assert!(state.node(&a_id).unwrap().source_symbols.is_empty());
    assert!(state.edges.iter().any(|edge| {
        edge.edge_type == EdgeType::Navigation && edge.source == a_id && edge.target == b_id
    }));
    assert!(harness.tracker.pending_symbol().is_none());
}

#[tokio::test(start_paused = true)]
async fn identifiers_go_stale_after_the_freshness_window() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let b = harness.workspace.b();

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: a.clone() })
        .await;
    let event = touch_do_thing(&harness);
    harness.tracker.handle_event(event).await;
    harness.tracker.wait_for_symbol_lookup().await;
    assert_eq!(
        harness.tracker.pending_symbol().map(|pending| pending.name),
        Some("doThing".to_owned())
    );

    tokio::time::advance(Duration::from_millis(3001)).await;
    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: b.clone() })
        .await;

    let state = harness.tracker.state();
    assert!(state.node(&node_id_for_path(&b)).unwrap().symbols.is_empty());
    assert!(state.node(&node_id_for_path(&a)).unwrap().source_symbols.is_empty());
    assert!(harness.tracker.pending_symbol().is_none());
}

#[tokio::test(start_paused = true)]
async fn identifiers_inside_the_window_still_count() {
    let mut harness = Harness::new().await;
    let b = harness.workspace.b();

    let event = touch_do_thing(&harness);
    harness.tracker.handle_event(event).await;
    harness.tracker.wait_for_symbol_lookup().await;
    tokio::time::advance(Duration::from_millis(2999)).await;
    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: b.clone() })
        .await;

    let node = harness.tracker.state().node(&node_id_for_path(&b)).unwrap();
    assert_eq!(node.symbols.len(), 1);
}

#[tokio::test]
async fn ranged_selections_and_keywords_are_not_recorded() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();

    harness
        .tracker
        .handle_event(EditorEvent::Select {
            path: a.clone(),
            selection: TextRange::new(TextPosition::new(3, 9), TextPosition::new(3, 16)),
            line_text: "  return doThing();".to_owned(),
        })
        .await;
    assert!(harness.tracker.pending_symbol().is_none());

    harness
        .tracker
        .handle_event(EditorEvent::caret(&a, TextPosition::new(3, 4), "  return doThing();"))
        .await;
    assert!(harness.tracker.pending_symbol().is_none());
}

#[tokio::test]
async fn returning_to_a_file_reuses_its_node_and_edge() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let b = harness.workspace.b();

    for path in [&a, &b, &a, &b] {
        harness
            .tracker
            .handle_event(EditorEvent::Focus { path: path.clone() })
            .await;
    }

    let state = harness.tracker.state();
    assert_eq!(state.nodes.len(), 2);
    let navigation = state
        .edges
        .iter()
        .filter(|edge| edge.edge_type == EdgeType::Navigation)
        .count();
    assert_eq!(navigation, 1);
}

#[tokio::test]
async fn refocusing_the_same_file_adds_no_self_edge() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: a.clone() })
        .await;
    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: a.clone() })
        .await;

    assert!(
        harness
            .tracker
            .state()
            .edges
            .iter()
            .all(|edge| edge.edge_type == EdgeType::Dependency)
    );
}

#[tokio::test]
async fn files_outside_plugins_stay_ungrouped() {
    let mut harness = Harness::new().await;
    let loose = harness.workspace.path("scripts/loose.ts");

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: loose.clone() })
        .await;

    let state = harness.tracker.state();
    let node = state.node(&node_id_for_path(&loose)).unwrap();
    assert_eq!(node.group_id, None);
    assert_eq!(node.plugin_name, None);
    assert_eq!(node.relative_path, "scripts");
    assert!(state.groups.is_empty());
}

#[tokio::test]
async fn closing_the_previous_file_breaks_the_chain() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let b = harness.workspace.b();

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: a.clone() })
        .await;
    harness
        .tracker
        .handle_event(EditorEvent::Close { path: a.clone() })
        .await;
    assert_eq!(harness.tracker.previous_file(), None);
    assert_eq!(harness.tracker.active_node_id(), None);

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: b.clone() })
        .await;
    assert!(
        harness
            .tracker
            .state()
            .edges
            .iter()
            .all(|edge| edge.edge_type != EdgeType::Navigation)
    );
}

#[tokio::test]
async fn open_symbol_prefers_the_reported_definition() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let b = harness.workspace.b();
    let elsewhere = harness.workspace.path("plugins/bar/public/impl.ts");
    harness.workspace.write("plugins/bar/public/impl.ts", "export {};\n");
    harness.host.set_definition(&a, 3, &elsewhere);

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: b.clone() })
        .await;
    let opened = harness
        .tracker
        .open_symbol(&node_id_for_path(&b), &SymbolRef::new("doThing", 3, &a))
        .await;

    assert_eq!(opened, Some(elsewhere.clone()));
    assert_eq!(harness.host.opened(), vec![elsewhere]);
}

#[tokio::test]
async fn open_symbol_follows_the_import_without_a_definition() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let b = harness.workspace.b();

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: b.clone() })
        .await;
    let opened = harness
        .tracker
        .open_symbol(&node_id_for_path(&b), &SymbolRef::new("doThing", 3, &a))
        .await;

    assert_eq!(opened, Some(b));
}

#[tokio::test]
async fn open_symbol_falls_back_to_the_annotated_file() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let c = harness.workspace.c();

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: c.clone() })
        .await;
    let opened = harness
        .tracker
        .open_symbol(&node_id_for_path(&c), &SymbolRef::new("mystery", 0, &a))
        .await;

    assert_eq!(opened, Some(c));
}

#[tokio::test]
async fn failed_open_warns_and_leaves_the_graph_alone() {
    let mut harness = Harness::new().await;
    let a = harness.workspace.a();
    let b = harness.workspace.b();
    harness.host.refuse_open(&b);

    harness
        .tracker
        .handle_event(EditorEvent::Focus { path: b.clone() })
        .await;
    let before = harness.tracker.state().clone();
    let opened = harness
        .tracker
        .open_symbol(&node_id_for_path(&b), &SymbolRef::new("doThing", 3, &a))
        .await;

    assert_eq!(opened, None);
    assert_eq!(harness.tracker.state(), &before);
    let warnings = harness.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("cannot open"));
}

#[tokio::test]
async fn focus_command_asks_for_the_panel() {
    let mut harness = Harness::new().await;
    harness
        .tracker
        .handle_event(EditorEvent::Command {
            command: "focusGraph".to_owned(),
        })
        .await;
    harness
        .tracker
        .handle_event(EditorEvent::Command {
            command: "selfDestruct".to_owned(),
        })
        .await;

    let notices = harness.notices.lock().unwrap().clone();
    assert_eq!(notices, vec![Notice::RevealPanel]);
}
