//! Per-mode selection of what the graph view shows.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use eframe::egui::{Pos2, vec2};
use log::{debug, warn};

use crate::layout::groups::{COMPACT_HEIGHT, COMPACT_WIDTH};
use crate::layout::{LayoutJob, LayoutNode, grid_layout, spawn_layout};
use crate::model::{
    EdgeType, FileNode, GraphState, GroupNode, GroupType, NavigationEdge, Position, ViewMode,
    group_id_for,
};
use crate::plugins::PluginInfo;

/// A filtered slice of the graph. Every edge has both endpoints present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection {
    pub nodes: Vec<FileNode>,
    pub groups: Vec<GroupNode>,
    pub edges: Vec<NavigationEdge>,
}

impl Projection {
    pub fn group(&self, id: &str) -> Option<&GroupNode> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn node(&self, id: &str) -> Option<&FileNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn has_endpoint(&self, id: &str) -> bool {
        self.group(id).is_some() || self.node(id).is_some()
    }

    fn drop_dangling_edges(&mut self) {
        let ids = self
            .nodes
            .iter()
            .map(|node| node.id.clone())
            .chain(self.groups.iter().map(|group| group.id.clone()))
            .collect::<HashSet<_>>();
        self.edges
            .retain(|edge| ids.contains(&edge.source) && ids.contains(&edge.target));
    }
}

/// Maps declared requirement spellings to indexed runtime ids, exact first and
/// then case-insensitively.
struct RuntimeIds<'a> {
    exact: HashSet<&'a str>,
    folded: HashMap<String, &'a str>,
}

impl<'a> RuntimeIds<'a> {
    fn new(plugins: &'a [PluginInfo]) -> Self {
        Self {
            exact: plugins.iter().map(|plugin| plugin.runtime_id.as_str()).collect(),
            folded: plugins
                .iter()
                .map(|plugin| (plugin.runtime_id.to_lowercase(), plugin.runtime_id.as_str()))
                .collect(),
        }
    }

    fn resolve(&self, declared: &str) -> Option<&'a str> {
        self.exact
            .get(declared)
            .copied()
            .or_else(|| self.folded.get(&declared.to_lowercase()).copied())
    }
}

struct PendingLayout {
    job: LayoutJob,
    deadline: Instant,
}

/// Force-layout positions of the complete architecture, reused while the set of
/// known plugins is unchanged.
///
/// The simulation runs on a worker thread. Until it answers, every plugin sits
/// on the fallback grid; a worker that misses its deadline leaves the grid in
/// place.
#[derive(Default)]
pub struct CompleteLayoutCache {
    key: Vec<String>,
    positions: HashMap<String, Position>,
    pending: Option<PendingLayout>,
}

impl CompleteLayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether the worker for the current plugin set has not answered yet.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn invalidate(&mut self) {
        self.key.clear();
        self.positions.clear();
        self.pending = None;
    }

    /// Top-left position for every known plugin group, keyed by group id. Never
    /// blocks: a changed plugin set starts a new worker and reports grid
    /// positions until it finishes.
    pub fn positions_for(
        &mut self,
        plugins: &[PluginInfo],
        timeout: Duration,
    ) -> &HashMap<String, Position> {
        let key = plugins
            .iter()
            .map(|plugin| plugin.runtime_id.clone())
            .collect::<Vec<_>>();
        if key != self.key || (self.positions.is_empty() && !key.is_empty()) {
            self.start(plugins, key, timeout);
        }
        self.poll();
        &self.positions
    }

    /// Blocks until the running worker answers or its deadline passes.
    pub fn wait(&mut self) {
        if let Some(pending) = self.pending.take() {
            let remaining = pending.deadline.saturating_duration_since(Instant::now());
            let positions = pending.job.wait(remaining);
            self.store(positions);
        }
    }

    fn start(&mut self, plugins: &[PluginInfo], key: Vec<String>, timeout: Duration) {
        let ids = RuntimeIds::new(plugins);
        let index_of = key
            .iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index))
            .collect::<HashMap<_, _>>();
        let nodes = key
            .iter()
            .map(|id| LayoutNode::new(group_id_for(id), vec2(COMPACT_WIDTH, COMPACT_HEIGHT)))
            .collect::<Vec<_>>();
        let mut edges = Vec::new();
        for (dependent, plugin) in plugins.iter().enumerate() {
            for declared in &plugin.required_plugins {
                if let Some(&dependency) = ids
                    .resolve(declared)
                    .and_then(|runtime_id| index_of.get(runtime_id))
                    && dependency != dependent
                {
                    edges.push((dependency, dependent));
                }
            }
        }

        debug!("complete layout started for {} plugins", key.len());
        self.key = key;
        self.store(grid_layout(self.key.len()));
        self.pending = Some(PendingLayout {
            job: spawn_layout(nodes, edges),
            deadline: Instant::now() + timeout,
        });
    }

    fn poll(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        if let Some(positions) = pending.job.poll() {
            self.pending = None;
            self.store(positions);
            debug!("complete layout ready for {} plugins", self.key.len());
        } else if Instant::now() >= pending.deadline {
            warn!("complete layout missed its deadline, keeping the grid");
            self.pending = None;
        }
    }

    fn store(&mut self, positions: Vec<Pos2>) {
        self.positions = self
            .key
            .iter()
            .zip(positions)
            .map(|(id, pos)| (group_id_for(id), Position::from(pos)))
            .collect();
    }
}

pub fn project(
    state: &GraphState,
    mode: ViewMode,
    plugins: &[PluginInfo],
    cache: &mut CompleteLayoutCache,
    layout_timeout: Duration,
) -> Projection {
    let mut projection = match mode {
        ViewMode::Journey => journey(state),
        ViewMode::Plugin => Projection {
            nodes: state.nodes.clone(),
            groups: state.groups.clone(),
            edges: state.edges.clone(),
        },
        ViewMode::Complete => complete(state, plugins, cache, layout_timeout),
    };
    projection.drop_dangling_edges();
    projection
}

fn journey(state: &GraphState) -> Projection {
    let groups = state
        .groups
        .iter()
        .filter(|group| group.group_type == GroupType::Plugin)
        .cloned()
        .collect::<Vec<_>>();
    let shown = groups.iter().map(|group| group.id.as_str()).collect::<HashSet<_>>();
    let nodes = state
        .nodes
        .iter()
        .filter(|node| node.group_id.as_deref().is_none_or(|id| shown.contains(id)))
        .cloned()
        .collect::<Vec<_>>();
    let edges = state
        .edges
        .iter()
        .filter(|edge| edge.edge_type != EdgeType::Dependency)
        .cloned()
        .collect();
    Projection {
        nodes,
        groups,
        edges,
    }
}

fn complete(
    state: &GraphState,
    plugins: &[PluginInfo],
    cache: &mut CompleteLayoutCache,
    layout_timeout: Duration,
) -> Projection {
    let mut projection = Projection {
        nodes: state.nodes.clone(),
        groups: state.groups.clone(),
        edges: state.edges.clone(),
    };
    let positions = cache.positions_for(plugins, layout_timeout);

    for plugin in plugins {
        let id = group_id_for(&plugin.runtime_id);
        if projection.group(&id).is_some() {
            continue;
        }
        projection.groups.push(GroupNode {
            position: positions.get(&id).copied().unwrap_or_default(),
            id,
            label: plugin.label().to_owned(),
            group_type: GroupType::Plugin,
            width: COMPACT_WIDTH,
            height: COMPACT_HEIGHT,
            required_plugins: Some(plugin.required_plugins.clone()),
            plugin_path: None,
        });
    }

    let ids = RuntimeIds::new(plugins);
    for plugin in plugins {
        for required in plugin
            .required_plugins
            .iter()
            .filter_map(|declared| ids.resolve(declared))
            .filter(|&required| required != plugin.runtime_id)
        {
            let edge = NavigationEdge::dependency(
                &group_id_for(required),
                &group_id_for(&plugin.runtime_id),
            );
            if !projection.edges.iter().any(|existing| existing.id == edge.id)
                && projection.has_endpoint(&edge.source)
                && projection.has_endpoint(&edge.target)
            {
                projection.edges.push(edge);
            }
        }
    }
    projection
}
