use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};

use super::persist::KeyValueStore;
use super::types::{EdgeType, FileNode, GraphState, GroupNode, NavigationEdge, ViewMode};

pub const STATE_KEY: &str = "navgraph.state";

/// Authoritative mutable graph plus its backing blob store.
pub struct GraphStore {
    state: GraphState,
    backend: Arc<dyn KeyValueStore>,
}

impl GraphStore {
    /// Loads the persisted blob; a missing or unreadable blob starts an empty graph.
    pub fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        let state = match backend.get(STATE_KEY) {
            Some(blob) => match serde_json::from_str::<GraphState>(&blob) {
                Ok(state) => state,
                Err(error) => {
                    warn!("discarding unreadable graph state: {error}");
                    GraphState::default()
                }
            },
            None => GraphState::default(),
        };
        debug!(
            "loaded graph: {} nodes, {} edges, {} groups",
            state.nodes.len(),
            state.edges.len(),
            state.groups.len()
        );
        Self { state, backend }
    }

    pub fn with_state(state: GraphState, backend: Arc<dyn KeyValueStore>) -> Self {
        Self { state, backend }
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Full re-persist. Failures are logged; the previous blob stays in place.
    pub fn persist(&self) {
        let blob = match serde_json::to_string(&self.state) {
            Ok(blob) => blob,
            Err(error) => {
                warn!("failed to serialize graph state: {error}");
                return;
            }
        };
        if let Err(error) = self.backend.set(STATE_KEY, &blob) {
            warn!("failed to persist graph state: {error}");
        }
    }

    pub fn node(&self, id: &str) -> Option<&FileNode> {
        self.state.node(id)
    }

    pub fn node_by_path(&self, path: &Path) -> Option<&FileNode> {
        self.state.node_by_path(path)
    }

    pub fn group(&self, id: &str) -> Option<&GroupNode> {
        self.state.group(id)
    }

    pub fn add_node(&mut self, node: FileNode) -> bool {
        if self.state.node(&node.id).is_some() {
            return false;
        }
        debug!("add node {} ({})", node.id, node.file_path.display());
        self.state.nodes.push(node);
        true
    }

    pub fn add_edge(&mut self, edge: NavigationEdge) -> bool {
        if self.state.edge(&edge.id).is_some() {
            return false;
        }
        debug!("add edge {}", edge.id);
        self.state.edges.push(edge);
        true
    }

    pub fn add_group(&mut self, group: GroupNode) -> bool {
        if self.state.group(&group.id).is_some() {
            return false;
        }
        debug!("add group {} ({:?})", group.id, group.group_type);
        self.state.groups.push(group);
        true
    }

    /// Removes the node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<FileNode> {
        let index = self.state.nodes.iter().position(|node| node.id == id)?;
        let node = self.state.nodes.remove(index);
        self.state.edges.retain(|edge| !edge.touches(id));
        debug!("removed node {id}");
        Some(node)
    }

    /// Removes the group and every edge touching it. Member files are left alone.
    pub fn remove_group(&mut self, id: &str) -> Option<GroupNode> {
        let index = self.state.groups.iter().position(|group| group.id == id)?;
        let group = self.state.groups.remove(index);
        self.state.edges.retain(|edge| !edge.touches(id));
        debug!("removed group {id}");
        Some(group)
    }

    pub fn remove_edges_where(&mut self, mut predicate: impl FnMut(&NavigationEdge) -> bool) {
        self.state.edges.retain(|edge| !predicate(edge));
    }

    pub fn update_node(&mut self, id: &str, update: impl FnOnce(&mut FileNode)) -> bool {
        match self.state.nodes.iter_mut().find(|node| node.id == id) {
            Some(node) => {
                update(node);
                true
            }
            None => false,
        }
    }

    pub fn update_group(&mut self, id: &str, update: impl FnOnce(&mut GroupNode)) -> bool {
        match self.state.groups.iter_mut().find(|group| group.id == id) {
            Some(group) => {
                update(group);
                true
            }
            None => false,
        }
    }

    pub fn groups_mut(&mut self) -> &mut [GroupNode] {
        &mut self.state.groups
    }

    pub fn nodes_mut(&mut self) -> &mut [FileNode] {
        &mut self.state.nodes
    }

    pub fn has_navigation_edge_between(&self, a: &str, b: &str) -> bool {
        self.state
            .edges
            .iter()
            .any(|edge| edge.edge_type == EdgeType::Navigation && edge.connects(a, b))
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.state.view_mode = mode;
    }

    /// Drops every node, edge and group. The view mode is kept.
    pub fn clear(&mut self) {
        self.state.nodes.clear();
        self.state.edges.clear();
        self.state.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::persist::MemoryStore;
    use crate::model::types::{GroupType, Position};

    fn file(id: &str, group: Option<&str>) -> FileNode {
        FileNode {
            id: id.to_owned(),
            file_path: PathBuf::from(format!("/w/{id}.ts")),
            file_name: format!("{id}.ts"),
            relative_path: String::new(),
            plugin_name: None,
            group_id: group.map(str::to_owned),
            position: Position::default(),
            symbols: Vec::new(),
            source_symbols: Vec::new(),
        }
    }

    fn group(id: &str) -> GroupNode {
        GroupNode {
            id: id.to_owned(),
            label: id.to_owned(),
            group_type: GroupType::Plugin,
            position: Position::default(),
            width: 100.0,
            height: 100.0,
            required_plugins: Some(Vec::new()),
            plugin_path: None,
        }
    }

    #[test]
    fn adds_are_idempotent() {
        let mut store = GraphStore::load(Arc::new(MemoryStore::new()));
        assert!(store.add_node(file("a", None)));
        assert!(!store.add_node(file("a", Some("group-x"))));
        assert!(store.add_group(group("group-x")));
        assert!(!store.add_group(group("group-x")));
        assert!(store.add_edge(NavigationEdge::navigation("a", "b")));
        assert!(!store.add_edge(NavigationEdge::navigation("a", "b")));

        assert_eq!(store.state().nodes.len(), 1);
        assert_eq!(store.state().nodes[0].group_id, None);
        assert_eq!(store.state().groups.len(), 1);
        assert_eq!(store.state().edges.len(), 1);
    }

    #[test]
    fn removing_endpoints_cascades_edges() {
        let mut store = GraphStore::load(Arc::new(MemoryStore::new()));
        store.add_node(file("a", None));
        store.add_node(file("b", None));
        store.add_group(group("group-x"));
        store.add_edge(NavigationEdge::navigation("a", "b"));
        store.add_edge(NavigationEdge::dependency("group-x", "group-y"));

        assert!(store.remove_node("b").is_some());
        assert!(store.state().edges.iter().all(|edge| edge.edge_type == EdgeType::Dependency));
        assert!(store.remove_group("group-x").is_some());
        assert!(store.state().edges.is_empty());
        assert!(store.remove_node("missing").is_none());
    }

    #[test]
    fn navigation_edges_are_checked_both_ways() {
        let mut store = GraphStore::load(Arc::new(MemoryStore::new()));
        store.add_edge(NavigationEdge::navigation("a", "b"));
        assert!(store.has_navigation_edge_between("b", "a"));
        assert!(!store.has_navigation_edge_between("a", "c"));
    }

    #[test]
    fn persist_round_trips_through_backend() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut store = GraphStore::load(Arc::clone(&backend));
        store.add_group(group("group-x"));
        store.add_node(file("a", Some("group-x")));
        store.set_view_mode(ViewMode::Plugin);
        store.persist();

        let reloaded = GraphStore::load(backend);
        assert_eq!(reloaded.state(), store.state());
    }

    #[test]
    fn unreadable_blob_starts_empty() {
        let backend = Arc::new(MemoryStore::with_entry(STATE_KEY, "{not json"));
        let store = GraphStore::load(backend);
        assert!(store.state().is_empty());
    }
}
